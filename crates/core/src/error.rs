//! Error types for the lifecycle service, intake pipeline, and directory.

use talon_storage::StorageError;

/// Errors from incident lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// No incident with this id exists.
    #[error("Incident not found: {incident_id}")]
    NotFound { incident_id: String },

    /// The repository failed for a reason other than a missing incident.
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for LifecycleError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::IncidentNotFound { incident_id } => {
                LifecycleError::NotFound { incident_id }
            }
            other => LifecycleError::Storage(other),
        }
    }
}

/// Failure of an extraction or classification collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{collaborator} failed: {message}")]
    Failed {
        collaborator: &'static str,
        message: String,
    },

    #[error("{collaborator} timed out after {after_ms} ms")]
    TimedOut {
        collaborator: &'static str,
        after_ms: u64,
    },
}

/// Errors from ingesting a raw report.
///
/// Validation and collaborator failures happen before the repository is
/// touched, so no incident exists when either is returned.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("invalid report: {0}")]
    Validation(String),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Errors building a resource directory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("resource directory must contain at least one resource")]
    Empty,

    #[error("duplicate resource id: {0}")]
    DuplicateId(String),
}
