use std::future::Future;
use std::sync::Arc;

use super::{expect_eq, make_incident, TestResult};
use crate::record::{AuditEntry, AuditEvent};
use crate::{IncidentRepository, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: IncidentRepository,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "same_id_updates_lose_nothing",
            same_id_updates_lose_nothing(factory().await).await,
        ),
        TestResult::from_result(
            "concurrent",
            "different_ids_all_succeed",
            different_ids_all_succeed(factory().await).await,
        ),
        TestResult::from_result(
            "concurrent",
            "open_snapshot_does_not_block_other_ids",
            open_snapshot_does_not_block_other_ids(factory().await).await,
        ),
    ]
}

/// Append one marker entry through a full begin/commit cycle.
async fn append_marker<S: IncidentRepository>(
    repo: &S,
    id: &str,
    marker: String,
) -> Result<(), StorageError> {
    let (snapshot, mut working) = repo.begin_update(id).await?;
    // Yield while holding the lock so racing tasks interleave here.
    tokio::task::yield_now().await;
    working.audit_log.append(AuditEntry {
        event: AuditEvent::DispatchDenied { reason: marker },
        timestamp: time::OffsetDateTime::now_utc(),
    });
    repo.commit_update(snapshot, working).await
}

async fn join_all(
    handles: Vec<tokio::task::JoinHandle<Result<(), StorageError>>>,
) -> Result<(), String> {
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
    }
    Ok(())
}

// ── Same id: every update lands exactly once ────────────────────────────────

/// N tasks each append a distinct entry to the same incident. With updates
/// serialized per id, the final log holds all N entries, none duplicated.
async fn same_id_updates_lose_nothing<S: IncidentRepository>(repo: S) -> Result<(), String> {
    let repo = Arc::new(repo);
    repo.save(make_incident("shared"))
        .await
        .map_err(|e| format!("save: {e}"))?;

    let handles = (0..N)
        .map(|i| {
            let r = repo.clone();
            tokio::spawn(async move { append_marker(r.as_ref(), "shared", format!("m-{i}")).await })
        })
        .collect();
    join_all(handles).await?;

    let stored = repo.get("shared").await.map_err(|e| format!("get: {e}"))?;
    let mut markers: Vec<String> = stored
        .audit_log
        .iter()
        .filter_map(|entry| match &entry.event {
            AuditEvent::DispatchDenied { reason } => Some(reason.clone()),
            _ => None,
        })
        .collect();
    markers.sort();
    markers.dedup();
    expect_eq("audit entries", stored.audit_log.len(), N)?;
    expect_eq("distinct markers", markers.len(), N)
}

// ── Different ids: no interference ──────────────────────────────────────────

async fn different_ids_all_succeed<S: IncidentRepository>(repo: S) -> Result<(), String> {
    let repo = Arc::new(repo);
    for i in 0..N {
        repo.save(make_incident(&format!("inc-{i}")))
            .await
            .map_err(|e| format!("save: {e}"))?;
    }

    let handles = (0..N)
        .map(|i| {
            let r = repo.clone();
            tokio::spawn(async move {
                append_marker(r.as_ref(), &format!("inc-{i}"), "only".to_string()).await
            })
        })
        .collect();
    join_all(handles).await?;

    for incident in repo.all().await.map_err(|e| format!("all: {e}"))? {
        expect_eq(
            &format!("audit entries of {}", incident.id),
            incident.audit_log.len(),
            1,
        )?;
    }
    Ok(())
}

async fn open_snapshot_does_not_block_other_ids<S: IncidentRepository>(
    repo: S,
) -> Result<(), String> {
    for id in ["a", "b"] {
        repo.save(make_incident(id))
            .await
            .map_err(|e| format!("save {id}: {e}"))?;
    }

    let (_held, _) = repo
        .begin_update("a")
        .await
        .map_err(|e| format!("begin a: {e}"))?;
    let other = tokio::time::timeout(std::time::Duration::from_secs(1), async {
        let (snapshot, working) = repo.begin_update("b").await?;
        repo.commit_update(snapshot, working).await
    })
    .await;
    match other {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("update of b: {e}")),
        Err(_) => Err("update of b waited on a's snapshot".to_string()),
    }
}
