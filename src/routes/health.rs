use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Sessions connected to this worker (not the whole cluster).
    pub connected_sessions: usize,
    /// How many of those sessions resumed an earlier connection.
    pub recovered_sessions: usize,
    /// Age of the oldest session on this worker, `null` when idle.
    pub oldest_session_age_secs: Option<u64>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connected_sessions: state.sessions.len(),
        recovered_sessions: state.sessions.recovered_len(),
        oldest_session_age_secs: state
            .sessions
            .longest_session_age()
            .map(|age| age.as_secs()),
    })
}
