/// All errors that can be returned by an IncidentRepository implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No incident is stored under the given id.
    #[error("incident not found: {incident_id}")]
    IncidentNotFound { incident_id: String },

    /// A commit tried to write an incident through another incident's snapshot.
    #[error("snapshot for incident {expected} cannot commit incident {found}")]
    SnapshotMismatch { expected: String, found: String },

    /// A backend-specific storage error (DB connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
