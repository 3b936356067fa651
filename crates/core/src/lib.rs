//! talon-core: incident lifecycle and dispatch-decision pipeline.
//!
//! Turns a classified emergency report into a tracked incident with a
//! dispatch recommendation, and governs every later operator decision on
//! it through an append-only audit log.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`IntakePipeline`] -- raw text to incident, shared by every channel
//! - [`IncidentService`] -- create / confirm / override / review / deny
//! - [`DispatchEngine`] -- recommendation from urgency and location
//! - [`ResourceDirectory`] -- facilities and nearest-facility lookup
//! - [`replay`] -- rebuild dispatch state from an audit log
//! - Collaborator traits: [`SymptomExtractor`], [`UrgencyClassifier`]

/// Service version reported by health endpoints.
pub const TALON_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod heuristic;
pub mod intake;
pub mod lifecycle;
pub mod transition;

// ── Convenience re-exports: key types ────────────────────────────────

pub use config::{Coordinates, DispatchConfig, DEFAULT_ETA_MINUTES, DEFAULT_LOCATION};
pub use directory::{Resource, ResourceDirectory};
pub use dispatch::{unit_for, DispatchEngine};
pub use error::{CollaboratorError, DirectoryError, IntakeError, LifecycleError};
pub use heuristic::{KeywordExtractor, RuleClassifier};
pub use intake::{
    Channel, IntakePipeline, IntakeReport, SymptomExtractor, UrgencyClassifier,
    DEFAULT_COLLABORATOR_TIMEOUT,
};
pub use lifecycle::{latest_recommendation, Classification, IncidentService, NewIncident};
pub use transition::{apply_event, replay, DispatchState, Transition};
