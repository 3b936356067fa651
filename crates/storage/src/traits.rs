use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::Incident;

/// The storage trait for incident backends.
///
/// An `IncidentRepository` provides keyed storage of incident records,
/// a full-scan listing, and serialized read-modify-write updates of a
/// single incident.
///
/// ## Snapshot Semantics
///
/// Updates to an existing incident go through a `Snapshot`, a token that
/// holds the incident's update lock. The lifecycle is:
///
/// 1. `begin_update(id)` — acquire the lock, returns the snapshot and a
///    working copy of the incident
/// 2. Mutate the working copy
/// 3. `commit_update(snapshot, incident)` — write the copy and release
///    OR `abort_update(snapshot)` — release without writing
///
/// If a `Snapshot` is dropped without committing, nothing is written.
///
/// ## Lock Granularity
///
/// Snapshots of the same incident id are mutually exclusive. Snapshots of
/// different ids never wait on each other. Reads (`get`, `all`) never
/// observe a half-applied update.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait IncidentRepository: Send + Sync + 'static {
    /// The snapshot (update lock) type used by this backend.
    ///
    /// Must be `Send` to allow holding it across await points.
    type Snapshot: Send;

    /// Insert an incident, or fully overwrite the stored incident with the
    /// same id. Insertion order is fixed by the first save of an id.
    async fn save(&self, incident: Incident) -> Result<(), StorageError>;

    /// Read an incident by id.
    ///
    /// Returns `Err(StorageError::IncidentNotFound)` if the id is unknown.
    async fn get(&self, incident_id: &str) -> Result<Incident, StorageError>;

    /// List every stored incident, in insertion order, as of call time.
    async fn all(&self) -> Result<Vec<Incident>, StorageError>;

    // ── Serialized updates ───────────────────────────────────────────────────

    /// Lock an incident for update and return a working copy.
    ///
    /// Waits while another snapshot of the same id is open.
    /// Returns `Err(StorageError::IncidentNotFound)` if the id is unknown.
    async fn begin_update(
        &self,
        incident_id: &str,
    ) -> Result<(Self::Snapshot, Incident), StorageError>;

    /// Write the working copy and release the lock.
    ///
    /// Returns `Err(StorageError::SnapshotMismatch)` if `incident.id` is not
    /// the id the snapshot was opened for; nothing is written in that case.
    async fn commit_update(
        &self,
        snapshot: Self::Snapshot,
        incident: Incident,
    ) -> Result<(), StorageError>;

    /// Release the lock without writing.
    async fn abort_update(&self, snapshot: Self::Snapshot) -> Result<(), StorageError> {
        drop(snapshot);
        Ok(())
    }
}
