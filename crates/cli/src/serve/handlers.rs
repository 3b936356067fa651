//! Core HTTP route handlers: health, intake, incidents, transitions, registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::error;

use talon_core::{latest_recommendation, Channel, IntakeError, IntakeReport, LifecycleError};
use talon_storage::{DispatchDecision, IncidentRepository, IncidentStatus, Urgency};

use super::json_error;
use super::state::AppState;

const SERVICE_NAME: &str = "talon";

/// Note recorded when an incident is confirmed with no recommendation on file.
const NO_RECOMMENDATION_NOTE: &str = "Confirmed without recommendation";

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeRequest {
    text: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReasonRequest {
    #[serde(default)]
    reason: Option<String>,
}

fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Incident not found").into_response()
}

/// Map a lifecycle failure to an HTTP response.
pub(crate) fn lifecycle_error(err: LifecycleError) -> Response {
    match err {
        LifecycleError::NotFound { .. } => not_found(),
        LifecycleError::Storage(e) => {
            error!(error = %e, "repository failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()).into_response()
        }
    }
}

/// Map an intake failure to an HTTP response.
pub(crate) fn intake_error(err: IntakeError) -> Response {
    match err {
        IntakeError::Validation(message) => {
            json_error(StatusCode::BAD_REQUEST, &message).into_response()
        }
        IntakeError::Collaborator(e) => {
            json_error(StatusCode::BAD_GATEWAY, &e.to_string()).into_response()
        }
        IntakeError::Lifecycle(e) => lifecycle_error(e),
    }
}

/// Parse an optional JSON body: empty means `None`.
fn optional_body<T: DeserializeOwned>(body: &Bytes) -> Result<Option<T>, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some).map_err(|e| {
        json_error(StatusCode::BAD_REQUEST, &format!("invalid request body: {}", e))
            .into_response()
    })
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    let response = serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": talon_core::TALON_VERSION,
    });
    (StatusCode::OK, Json(response))
}

/// POST /analyze
pub(crate) async fn handle_analyze(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    let request = match optional_body::<AnalyzeRequest>(&body) {
        Ok(Some(request)) => request,
        Ok(None) => {
            return json_error(StatusCode::BAD_REQUEST, "Text cannot be empty").into_response()
        }
        Err(response) => return response,
    };
    let report =
        IntakeReport::new(Channel::Api, request.text).with_location(request.lat, request.lon);
    match state.pipeline.ingest(report).await {
        Ok(incident) => {
            let response = serde_json::json!({
                "incident_id": incident.id,
                "symptoms": incident.symptoms,
                "urgency": incident.urgency,
                "dispatch_required": incident.dispatch_required,
                "reasoning": incident.reasoning,
            });
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => intake_error(e),
    }
}

/// GET /incidents
pub(crate) async fn handle_list_incidents(State(state): State<Arc<AppState>>) -> Response {
    match state.service().repository().all().await {
        Ok(incidents) => (StatusCode::OK, Json(incidents)).into_response(),
        Err(e) => lifecycle_error(e.into()),
    }
}

/// GET /incident/{id}
pub(crate) async fn handle_get_incident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.service().repository().get(&id).await {
        Ok(incident) => (StatusCode::OK, Json(incident)).into_response(),
        Err(e) => lifecycle_error(e.into()),
    }
}

/// POST /incidents/{id}/dispatch
///
/// The body is an optional `DispatchDecision`. Without one the latest
/// recommendation is confirmed as-is.
pub(crate) async fn handle_dispatch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let decision = match optional_body::<DispatchDecision>(&body) {
        Ok(Some(decision)) => decision,
        Ok(None) => match state.service().repository().get(&id).await {
            Ok(incident) => match latest_recommendation(&incident) {
                Some(rec) => DispatchDecision::from(rec),
                None => DispatchDecision {
                    notes: Some(NO_RECOMMENDATION_NOTE.to_string()),
                    ..DispatchDecision::default()
                },
            },
            Err(e) => return lifecycle_error(e.into()),
        },
        Err(response) => return response,
    };

    match state.service().confirm_dispatch(&id, decision).await {
        Ok(incident) => (StatusCode::OK, Json(incident.dispatch_confirmed)).into_response(),
        Err(e) => lifecycle_error(e),
    }
}

/// POST /incidents/{id}/override
pub(crate) async fn handle_override(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let reason = match optional_body::<ReasonRequest>(&body) {
        Ok(request) => request.and_then(|r| r.reason).unwrap_or_default(),
        Err(response) => return response,
    };
    if reason.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "Reason cannot be empty").into_response();
    }

    match state.service().override_dispatch(&id, reason).await {
        Ok(incident) => {
            let response = serde_json::json!({
                "status": incident.status,
                "override_reason": incident.override_reason,
            });
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => lifecycle_error(e),
    }
}

/// POST /incidents/{id}/review
pub(crate) async fn handle_review(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let reason = match optional_body::<ReasonRequest>(&body) {
        Ok(request) => request.and_then(|r| r.reason),
        Err(response) => return response,
    };
    match state.service().request_manual_review(&id, reason).await {
        Ok(incident) => status_response(incident.status),
        Err(e) => lifecycle_error(e),
    }
}

/// POST /incidents/{id}/deny
pub(crate) async fn handle_deny(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let reason = match optional_body::<ReasonRequest>(&body) {
        Ok(request) => request.and_then(|r| r.reason),
        Err(response) => return response,
    };
    match state.service().deny_dispatch(&id, reason).await {
        Ok(incident) => status_response(incident.status),
        Err(e) => lifecycle_error(e),
    }
}

fn status_response(status: IncidentStatus) -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": status }))).into_response()
}

/// GET /resources
pub(crate) async fn handle_resources(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.directory().resources().to_vec()))
}

/// GET /stats
pub(crate) async fn handle_stats(State(state): State<Arc<AppState>>) -> Response {
    let incidents = match state.service().repository().all().await {
        Ok(incidents) => incidents,
        Err(e) => return lifecycle_error(e.into()),
    };

    let mut by_urgency: BTreeMap<&str, usize> =
        Urgency::ALL.iter().map(|u| (u.as_str(), 0)).collect();
    let mut by_status: BTreeMap<&str, usize> =
        IncidentStatus::ALL.iter().map(|s| (s.as_str(), 0)).collect();
    for incident in &incidents {
        *by_urgency.entry(incident.urgency.as_str()).or_default() += 1;
        *by_status.entry(incident.status.as_str()).or_default() += 1;
    }

    let response = serde_json::json!({
        "total": incidents.len(),
        "by_urgency": by_urgency,
        "by_status": by_status,
    });
    (StatusCode::OK, Json(response)).into_response()
}
