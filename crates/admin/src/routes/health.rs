//! Health checks for the admin process.

use axum::{extract::State, http::StatusCode};

use crate::state::AppState;

pub async fn health() -> &'static str {
    "ok"
}

/// 200 when the database answers, 503 otherwise.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
