//! Incident lifecycle integration tests.
//!
//! Drives the public API the way the HTTP layer does:
//!
//! 1. Nearest-facility scenario over the built-in registry
//! 2. End-to-end intake of a critical report
//! 3. Concurrent transitions on one incident: no lost or duplicated entries
//! 4. Concurrent transitions on different incidents proceed independently
//! 5. Unknown ids under concurrency fail cleanly and change nothing

use std::collections::BTreeSet;
use std::sync::Arc;

use talon_core::{
    replay, Channel, DispatchConfig, DispatchEngine, DispatchState, IncidentService,
    IntakePipeline, IntakeReport, KeywordExtractor, LifecycleError, ResourceDirectory,
    RuleClassifier,
};
use talon_storage::{
    AuditEvent, DispatchDecision, IncidentRepository, InMemoryRepository, UnitType, Urgency,
};

// ──────────────────────────────────────────────
// Test fixtures
// ──────────────────────────────────────────────

fn service() -> Arc<IncidentService<InMemoryRepository>> {
    Arc::new(IncidentService::new(
        Arc::new(InMemoryRepository::new()),
        DispatchEngine::new(
            Arc::new(ResourceDirectory::builtin()),
            DispatchConfig::default(),
        ),
    ))
}

fn pipeline(service: Arc<IncidentService<InMemoryRepository>>) -> IntakePipeline<InMemoryRepository> {
    IntakePipeline::new(
        service,
        Arc::new(KeywordExtractor::new()),
        Arc::new(RuleClassifier::new()),
    )
}

/// Reason or note carried by a transition event, used to identify calls.
fn marker(event: &AuditEvent) -> Option<String> {
    match event {
        AuditEvent::DispatchRecommended(_) => None,
        AuditEvent::DispatchConfirmed { decision } => decision.notes.clone(),
        AuditEvent::DispatchOverridden { reason }
        | AuditEvent::ManualReviewRequested { reason }
        | AuditEvent::DispatchDenied { reason } => Some(reason.clone()),
    }
}

// ──────────────────────────────────────────────
// 1. Nearest facility
// ──────────────────────────────────────────────

#[test]
fn nearest_facility_scenario() {
    let dir = ResourceDirectory::builtin();
    assert_eq!(dir.nearest_to(Some(23.25), Some(77.42)).id, "H2");
    assert_eq!(dir.nearest_to(None, None).id, "H1");
}

// ──────────────────────────────────────────────
// 2. Intake end to end
// ──────────────────────────────────────────────

#[tokio::test]
async fn critical_report_end_to_end() {
    let svc = service();
    let pipeline = pipeline(svc.clone());

    let inc = pipeline
        .ingest(IntakeReport::new(Channel::Api, "chest pain, can't breathe"))
        .await
        .unwrap();

    assert_eq!(inc.symptoms, vec!["chest_pain", "breathing_difficulty"]);
    assert_eq!(inc.urgency, Urgency::Critical);
    assert!(inc.dispatch_required);
    assert_eq!(inc.audit_log.len(), 1);
    match &inc.audit_log.entries()[0].event {
        AuditEvent::DispatchRecommended(rec) => {
            assert_eq!(rec.unit_type, UnitType::AlsAmbulance);
            assert_eq!(rec.resource_id, "H2");
        }
        other => panic!("unexpected event {:?}", other),
    }

    let stored = svc.repository().get(&inc.id).await.unwrap();
    assert_eq!(stored, inc);
}

#[tokio::test]
async fn routine_report_has_no_recommendation() {
    let svc = service();
    let inc = pipeline(svc)
        .ingest(IntakeReport::new(Channel::Sms, "bit of a cough and a headache"))
        .await
        .unwrap();
    assert_eq!(inc.urgency, Urgency::Routine);
    assert!(!inc.dispatch_required);
    assert!(inc.audit_log.is_empty());
}

// ──────────────────────────────────────────────
// 3. Concurrent transitions, same incident
// ──────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transitions_on_one_incident_are_serialized() {
    const CALLS: usize = 64;

    let svc = service();
    let inc = pipeline(svc.clone())
        .ingest(IntakeReport::new(Channel::Voice, "he collapsed and is not breathing"))
        .await
        .unwrap();
    let initial_len = inc.audit_log.len();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..CALLS {
        let svc = svc.clone();
        let id = inc.id.clone();
        tasks.spawn(async move {
            let tag = format!("call-{}", i);
            match i % 4 {
                0 => {
                    svc.confirm_dispatch(
                        &id,
                        DispatchDecision {
                            notes: Some(tag),
                            ..DispatchDecision::default()
                        },
                    )
                    .await
                }
                1 => svc.override_dispatch(&id, tag).await,
                2 => svc.deny_dispatch(&id, Some(tag)).await,
                _ => svc.request_manual_review(&id, Some(tag)).await,
            }
        });
    }

    let mut successes = 0;
    while let Some(joined) = tasks.join_next().await {
        if joined.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, CALLS);

    let stored = svc.repository().get(&inc.id).await.unwrap();
    assert_eq!(stored.audit_log.len(), initial_len + successes);

    let markers: Vec<String> = stored
        .audit_log
        .iter()
        .filter_map(|e| marker(&e.event))
        .collect();
    let unique: BTreeSet<&String> = markers.iter().collect();
    assert_eq!(markers.len(), CALLS, "entries were dropped");
    assert_eq!(unique.len(), CALLS, "entries were duplicated");

    assert_eq!(replay(&stored.audit_log), DispatchState::of(&stored));
}

// ──────────────────────────────────────────────
// 4. Concurrent transitions, different incidents
// ──────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transitions_across_incidents() {
    let svc = service();
    let pipeline = pipeline(svc.clone());
    let mut ids = Vec::new();
    for text in ["broken arm", "severe bleeding", "high fever", "seizure"] {
        ids.push(
            pipeline
                .ingest(IntakeReport::new(Channel::Api, text))
                .await
                .unwrap()
                .id,
        );
    }

    let mut tasks = tokio::task::JoinSet::new();
    for round in 0..8 {
        for id in &ids {
            let svc = svc.clone();
            let id = id.clone();
            tasks.spawn(async move {
                svc.deny_dispatch(&id, Some(format!("round-{}", round)))
                    .await
            });
        }
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    for inc in svc.repository().all().await.unwrap() {
        // One recommendation plus eight denials each.
        assert_eq!(inc.audit_log.len(), 9);
        assert_eq!(replay(&inc.audit_log), DispatchState::of(&inc));
    }
}

// ──────────────────────────────────────────────
// 5. Unknown ids
// ──────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unknown_ids_fail_cleanly_under_concurrency() {
    let svc = service();
    let inc = pipeline(svc.clone())
        .ingest(IntakeReport::new(Channel::Api, "chest pain"))
        .await
        .unwrap();
    let before = svc.repository().all().await.unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..16 {
        let svc = svc.clone();
        tasks.spawn(async move {
            let id = format!("missing-{}", i);
            svc.confirm_dispatch(&id, DispatchDecision::default()).await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        assert!(matches!(
            joined.unwrap(),
            Err(LifecycleError::NotFound { .. })
        ));
    }

    let after = svc.repository().all().await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].id, inc.id);
}
