//! Synthetic load handler.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use super::json_error;
use super::state::AppState;
use crate::simulate::{check_cases, run_simulation, DEFAULT_SIMULATION_CASES};

#[derive(Debug, Deserialize)]
pub(crate) struct SimulateParams {
    cases: Option<usize>,
}

/// POST /simulate?cases=N
pub(crate) async fn handle_simulate(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SimulateParams>,
) -> Response {
    let cases = match check_cases(params.cases.unwrap_or(DEFAULT_SIMULATION_CASES)) {
        Ok(cases) => cases,
        Err(e) => return json_error(StatusCode::BAD_REQUEST, &e.to_string()).into_response(),
    };
    let summary = run_simulation(state.pipeline.clone(), cases).await;
    (StatusCode::OK, Json(summary)).into_response()
}
