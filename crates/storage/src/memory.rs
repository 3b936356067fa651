//! Process-local incident storage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::error::StorageError;
use crate::record::Incident;
use crate::traits::IncidentRepository;

/// Rows keyed by incident id, plus the order ids were first saved in.
#[derive(Default)]
struct Table {
    rows: HashMap<String, Arc<Mutex<Incident>>>,
    order: Vec<String>,
}

/// In-memory `IncidentRepository`.
///
/// The table lock is only held long enough to find or insert a row; each
/// row carries its own mutex, which is what serializes updates per id.
#[derive(Default)]
pub struct InMemoryRepository {
    table: RwLock<Table>,
}

/// Update lock on one in-memory row.
pub struct InMemorySnapshot {
    incident_id: String,
    guard: OwnedMutexGuard<Incident>,
}

impl InMemorySnapshot {
    pub fn incident_id(&self) -> &str {
        &self.incident_id
    }
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored incidents.
    pub async fn len(&self) -> usize {
        self.table.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn row(&self, incident_id: &str) -> Result<Arc<Mutex<Incident>>, StorageError> {
        self.table
            .read()
            .await
            .rows
            .get(incident_id)
            .cloned()
            .ok_or_else(|| StorageError::IncidentNotFound {
                incident_id: incident_id.to_string(),
            })
    }
}

#[async_trait]
impl IncidentRepository for InMemoryRepository {
    type Snapshot = InMemorySnapshot;

    async fn save(&self, incident: Incident) -> Result<(), StorageError> {
        let row = {
            let mut table = self.table.write().await;
            match table.rows.get(&incident.id).cloned() {
                Some(row) => row,
                None => {
                    let id = incident.id.clone();
                    table.rows.insert(id.clone(), Arc::new(Mutex::new(incident)));
                    table.order.push(id);
                    return Ok(());
                }
            }
        };

        // Overwrite outside the table lock so other ids stay unblocked.
        *row.lock().await = incident;
        Ok(())
    }

    async fn get(&self, incident_id: &str) -> Result<Incident, StorageError> {
        let row = self.row(incident_id).await?;
        let incident = row.lock().await.clone();
        Ok(incident)
    }

    async fn all(&self) -> Result<Vec<Incident>, StorageError> {
        let rows: Vec<Arc<Mutex<Incident>>> = {
            let table = self.table.read().await;
            table
                .order
                .iter()
                .filter_map(|id| table.rows.get(id).cloned())
                .collect()
        };

        let mut incidents = Vec::with_capacity(rows.len());
        for row in rows {
            incidents.push(row.lock().await.clone());
        }
        Ok(incidents)
    }

    async fn begin_update(
        &self,
        incident_id: &str,
    ) -> Result<(InMemorySnapshot, Incident), StorageError> {
        let row = self.row(incident_id).await?;
        let guard = row.lock_owned().await;
        let working = guard.clone();
        Ok((
            InMemorySnapshot {
                incident_id: incident_id.to_string(),
                guard,
            },
            working,
        ))
    }

    async fn commit_update(
        &self,
        snapshot: InMemorySnapshot,
        incident: Incident,
    ) -> Result<(), StorageError> {
        if incident.id != snapshot.incident_id {
            return Err(StorageError::SnapshotMismatch {
                expected: snapshot.incident_id,
                found: incident.id,
            });
        }
        let mut guard = snapshot.guard;
        *guard = incident;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conformance::run_conformance_suite;
    use crate::record::{AuditLog, IncidentStatus, Urgency};
    use std::time::Duration;
    use time::OffsetDateTime;

    fn incident(id: &str) -> Incident {
        let now = OffsetDateTime::now_utc();
        Incident {
            id: id.to_string(),
            created_at: now,
            updated_at: now,
            input_text: "fell off a ladder".to_string(),
            symptoms: vec!["fall".to_string()],
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

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn in_memory_conformance() {
        let report = run_conformance_suite(|| async { InMemoryRepository::new() }).await;
        assert!(report.total > 0);
        assert!(report.failed == 0, "{report}");
    }

    #[tokio::test]
    async fn len_tracks_distinct_ids() {
        let repo = InMemoryRepository::new();
        assert!(repo.is_empty().await);
        repo.save(incident("a")).await.unwrap();
        repo.save(incident("b")).await.unwrap();
        repo.save(incident("a")).await.unwrap();
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn snapshot_reports_its_id() {
        let repo = InMemoryRepository::new();
        repo.save(incident("a")).await.unwrap();
        let (snapshot, working) = repo.begin_update("a").await.unwrap();
        assert_eq!(snapshot.incident_id(), "a");
        assert_eq!(working.input_text, "fell off a ladder");
    }

    #[tokio::test]
    async fn open_snapshot_blocks_same_id() {
        let repo = InMemoryRepository::new();
        repo.save(incident("a")).await.unwrap();

        let (_held, _) = repo.begin_update("a").await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(100), repo.begin_update("a")).await;
        assert!(second.is_err(), "second snapshot of a was granted while first was open");
    }
}
