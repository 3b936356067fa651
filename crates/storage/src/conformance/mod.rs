//! Conformance test suite for `IncidentRepository` implementations.
//!
//! This module provides a backend-agnostic test suite that any
//! `IncidentRepository` implementation can run to verify correctness. The
//! suite covers:
//!
//! - **Records**: save/get round trip, overwrite by id, listing order
//! - **Updates**: commit, abort, drop, mismatched commits, unknown ids
//! - **Concurrency**: same-id updates serialize, different ids proceed
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty repository for each test:
//!
//! ```ignore
//! use talon_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test(flavor = "multi_thread")]
//! async fn sqlite_conformance() {
//!     let report = run_conformance_suite(|| async { open_test_db().await }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```
//!
//! The concurrency tests spawn tasks, so the suite must run inside a Tokio
//! runtime.

mod concurrent;
mod records;
mod update;

use std::fmt;
use std::future::Future;

use time::OffsetDateTime;

use crate::record::{AuditLog, Incident, IncidentStatus, Urgency};
use crate::IncidentRepository;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category ("records", "update", "concurrent").
    pub category: String,
    /// Test name (e.g. "save_then_get_round_trips").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a repository backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// repository, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: IncidentRepository,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(records::run_record_tests(&factory).await);
    results.extend(update::run_update_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn make_incident(id: &str) -> Incident {
    let now = OffsetDateTime::now_utc();
    Incident {
        id: id.to_string(),
        created_at: now,
        updated_at: now,
        input_text: format!("report {id}"),
        symptoms: vec!["fever".to_string()],
        urgency: Urgency::Routine,
        dispatch_required: false,
        dispatch_confirmed: false,
        dispatch_decision: None,
        status: IncidentStatus::Created,
        lat: None,
        lon: None,
        reasoning: vec![],
        audit_log: AuditLog::new(),
        override_reason: None,
    }
}

fn expect_eq<T: PartialEq + fmt::Debug>(what: &str, got: T, want: T) -> Result<(), String> {
    if got == want {
        Ok(())
    } else {
        Err(format!("{what}: expected {want:?}, got {got:?}"))
    }
}
