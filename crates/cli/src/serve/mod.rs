//! `talon serve` -- HTTP API and carrier webhooks for the dispatch service.
//!
//! Endpoints:
//! - GET  /health                       - Service status and version
//! - POST /analyze                      - Ingest a report, create an incident
//! - GET  /incidents                    - All incidents in creation order
//! - GET  /incident/{id}                - One incident with its audit log
//! - POST /incidents/{id}/dispatch      - Confirm dispatch
//! - POST /incidents/{id}/override      - Override the recommendation
//! - POST /incidents/{id}/review        - Request manual review
//! - POST /incidents/{id}/deny          - Deny dispatch
//! - GET  /resources                    - Facility registry
//! - GET  /stats                        - Counts by urgency and status
//! - POST /simulate?cases=N             - Synthetic load
//! - POST /webhooks/sms                 - Inbound SMS (TwiML reply)
//! - POST /webhooks/voice               - Inbound call (TwiML greeting + record)
//! - POST /webhooks/process_recording   - Recording finished
//! - POST /webhooks/transcription       - Transcribed voice report
//!
//! JSON endpoints answer errors as `{"error": "..."}`.

mod handlers;
mod simulate;
mod state;
mod webhooks;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::settings::Pipeline;

use self::handlers::{
    handle_analyze, handle_deny, handle_dispatch, handle_get_incident, handle_health,
    handle_list_incidents, handle_not_found, handle_override, handle_resources, handle_review,
    handle_stats,
};
use self::simulate::handle_simulate;
use self::state::AppState;
use self::webhooks::{handle_recording, handle_sms, handle_transcription, handle_voice};

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"error": message})))
}

/// Build the application router over `pipeline`.
pub(crate) fn build_router(pipeline: Arc<Pipeline>) -> Router {
    let state = Arc::new(AppState::new(pipeline));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/analyze", post(handle_analyze))
        .route("/incidents", get(handle_list_incidents))
        .route("/incident/{id}", get(handle_get_incident))
        .route("/incidents/{id}/dispatch", post(handle_dispatch))
        .route("/incidents/{id}/override", post(handle_override))
        .route("/incidents/{id}/review", post(handle_review))
        .route("/incidents/{id}/deny", post(handle_deny))
        .route("/resources", get(handle_resources))
        .route("/stats", get(handle_stats))
        .route("/simulate", post(handle_simulate))
        .route("/webhooks/sms", post(handle_sms))
        .route("/webhooks/voice", post(handle_voice))
        .route("/webhooks/process_recording", post(handle_recording))
        .route("/webhooks/transcription", post(handle_transcription))
        .fallback(handle_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// Serve the API on `port` until Ctrl+C.
pub(crate) async fn start_server(
    port: u16,
    pipeline: Arc<Pipeline>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(pipeline);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "talon listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("received shutdown signal");
}
