use std::future::Future;

use super::{expect_eq, make_incident, TestResult};
use crate::{IncidentRepository, StorageError};

pub(super) async fn run_record_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: IncidentRepository,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "records",
            "save_then_get_round_trips",
            save_then_get_round_trips(factory().await).await,
        ),
        TestResult::from_result(
            "records",
            "get_unknown_is_not_found",
            get_unknown_is_not_found(factory().await).await,
        ),
        TestResult::from_result(
            "records",
            "save_overwrites_by_id",
            save_overwrites_by_id(factory().await).await,
        ),
        TestResult::from_result(
            "records",
            "all_keeps_insertion_order",
            all_keeps_insertion_order(factory().await).await,
        ),
        TestResult::from_result(
            "records",
            "empty_repository_lists_nothing",
            empty_repository_lists_nothing(factory().await).await,
        ),
    ]
}

async fn save_then_get_round_trips<S: IncidentRepository>(repo: S) -> Result<(), String> {
    let incident = make_incident("inc-1");
    repo.save(incident.clone())
        .await
        .map_err(|e| format!("save: {e}"))?;
    let got = repo.get("inc-1").await.map_err(|e| format!("get: {e}"))?;
    expect_eq("stored incident", got, incident)
}

async fn get_unknown_is_not_found<S: IncidentRepository>(repo: S) -> Result<(), String> {
    match repo.get("missing").await {
        Err(StorageError::IncidentNotFound { incident_id }) => {
            expect_eq("incident_id", incident_id.as_str(), "missing")
        }
        other => Err(format!("expected IncidentNotFound, got {other:?}")),
    }
}

async fn save_overwrites_by_id<S: IncidentRepository>(repo: S) -> Result<(), String> {
    repo.save(make_incident("inc-1"))
        .await
        .map_err(|e| format!("save: {e}"))?;
    let mut updated = make_incident("inc-1");
    updated.input_text = "rewritten".to_string();
    repo.save(updated).await.map_err(|e| format!("resave: {e}"))?;

    let all = repo.all().await.map_err(|e| format!("all: {e}"))?;
    expect_eq("incident count", all.len(), 1)?;
    expect_eq("input_text", all[0].input_text.as_str(), "rewritten")
}

async fn all_keeps_insertion_order<S: IncidentRepository>(repo: S) -> Result<(), String> {
    for id in ["c", "a", "b"] {
        repo.save(make_incident(id))
            .await
            .map_err(|e| format!("save {id}: {e}"))?;
    }
    // Re-saving an id must not move it.
    repo.save(make_incident("c"))
        .await
        .map_err(|e| format!("resave: {e}"))?;

    let all = repo.all().await.map_err(|e| format!("all: {e}"))?;
    let ids: Vec<&str> = all.iter().map(|i| i.id.as_str()).collect();
    expect_eq("listing order", ids, vec!["c", "a", "b"])
}

async fn empty_repository_lists_nothing<S: IncidentRepository>(repo: S) -> Result<(), String> {
    let all = repo.all().await.map_err(|e| format!("all: {e}"))?;
    expect_eq("incident count", all.len(), 0)
}
