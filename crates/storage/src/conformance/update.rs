use std::future::Future;

use super::{expect_eq, make_incident, TestResult};
use crate::record::IncidentStatus;
use crate::{IncidentRepository, StorageError};

pub(super) async fn run_update_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: IncidentRepository,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "update",
            "commit_writes_working_copy",
            commit_writes_working_copy(factory().await).await,
        ),
        TestResult::from_result(
            "update",
            "abort_discards_working_copy",
            abort_discards_working_copy(factory().await).await,
        ),
        TestResult::from_result(
            "update",
            "dropped_snapshot_discards_working_copy",
            dropped_snapshot_discards_working_copy(factory().await).await,
        ),
        TestResult::from_result(
            "update",
            "commit_rejects_foreign_incident",
            commit_rejects_foreign_incident(factory().await).await,
        ),
        TestResult::from_result(
            "update",
            "begin_unknown_is_not_found",
            begin_unknown_is_not_found(factory().await).await,
        ),
    ]
}

async fn seed<S: IncidentRepository>(repo: &S, ids: &[&str]) -> Result<(), String> {
    for id in ids {
        repo.save(make_incident(id))
            .await
            .map_err(|e| format!("seed {id}: {e}"))?;
    }
    Ok(())
}

async fn status_of<S: IncidentRepository>(repo: &S, id: &str) -> Result<IncidentStatus, String> {
    repo.get(id)
        .await
        .map(|i| i.status)
        .map_err(|e| format!("get {id}: {e}"))
}

async fn commit_writes_working_copy<S: IncidentRepository>(repo: S) -> Result<(), String> {
    seed(&repo, &["a"]).await?;
    let (snapshot, mut working) = repo
        .begin_update("a")
        .await
        .map_err(|e| format!("begin: {e}"))?;
    working.status = IncidentStatus::DispatchDenied;
    repo.commit_update(snapshot, working)
        .await
        .map_err(|e| format!("commit: {e}"))?;
    expect_eq("status", status_of(&repo, "a").await?, IncidentStatus::DispatchDenied)
}

async fn abort_discards_working_copy<S: IncidentRepository>(repo: S) -> Result<(), String> {
    seed(&repo, &["a"]).await?;
    let (snapshot, mut working) = repo
        .begin_update("a")
        .await
        .map_err(|e| format!("begin: {e}"))?;
    working.status = IncidentStatus::DispatchDenied;
    repo.abort_update(snapshot)
        .await
        .map_err(|e| format!("abort: {e}"))?;
    expect_eq("status", status_of(&repo, "a").await?, IncidentStatus::Created)
}

async fn dropped_snapshot_discards_working_copy<S: IncidentRepository>(
    repo: S,
) -> Result<(), String> {
    seed(&repo, &["a"]).await?;
    {
        let (_snapshot, mut working) = repo
            .begin_update("a")
            .await
            .map_err(|e| format!("begin: {e}"))?;
        working.status = IncidentStatus::DispatchDenied;
    }
    expect_eq("status", status_of(&repo, "a").await?, IncidentStatus::Created)?;

    // The lock must have been released by the drop.
    let reopened = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        repo.begin_update("a"),
    )
    .await;
    match reopened {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(format!("reopen: {e}")),
        Err(_) => Err("snapshot lock was not released on drop".to_string()),
    }
}

async fn commit_rejects_foreign_incident<S: IncidentRepository>(repo: S) -> Result<(), String> {
    seed(&repo, &["a", "b"]).await?;
    let (snapshot, _) = repo
        .begin_update("a")
        .await
        .map_err(|e| format!("begin: {e}"))?;
    let mut foreign = make_incident("b");
    foreign.status = IncidentStatus::DispatchConfirmed;

    match repo.commit_update(snapshot, foreign).await {
        Err(StorageError::SnapshotMismatch { expected, found }) => {
            expect_eq("expected id", expected.as_str(), "a")?;
            expect_eq("found id", found.as_str(), "b")?;
        }
        other => return Err(format!("expected SnapshotMismatch, got {other:?}")),
    }
    expect_eq("status of a", status_of(&repo, "a").await?, IncidentStatus::Created)?;
    expect_eq("status of b", status_of(&repo, "b").await?, IncidentStatus::Created)
}

async fn begin_unknown_is_not_found<S: IncidentRepository>(repo: S) -> Result<(), String> {
    match repo.begin_update("missing").await {
        Err(StorageError::IncidentNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected IncidentNotFound, got {e}")),
        Ok(_) => Err("expected IncidentNotFound, got a snapshot".to_string()),
    }
}
