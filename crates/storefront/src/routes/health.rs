//! Liveness and readiness checks.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

/// Liveness: the process is up. Checks nothing else.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness: the database answers.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
