//! Persists failed requests to `store.app_error_log`.
//!
//! Runs after the handler: when the response carries an [`ErrorLogEntry`]
//! the entry is written from a spawned task together with the request's
//! method, path, request id and logged-in user.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use tower_sessions::Session;

use crate::models::CurrentUser;
use crate::services::ErrorLogEntry;
use crate::services::error_log::{RequestContext, spawn_record};

use super::request_id::RequestId;

/// Where and how one app records its errors.
#[derive(Clone)]
pub struct ErrorLogSink {
    pub pool: PgPool,
    /// "storefront" or "admin".
    pub source: &'static str,
    /// Session key holding the logged-in user for this app.
    pub session_key: &'static str,
}

pub async fn error_log_middleware(
    State(sink): State<ErrorLogSink>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_owned();
    let request_id = request.extensions().get::<RequestId>().map(|r| r.0.clone());
    let session = request.extensions().get::<Session>().cloned();

    let response = next.run(request).await;

    let Some(entry) = response.extensions().get::<ErrorLogEntry>().cloned() else {
        return response;
    };

    let user_id = match session {
        Some(session) => session
            .get::<CurrentUser>(sink.session_key)
            .await
            .ok()
            .flatten()
            .map(|u| u.id),
        None => None,
    };

    spawn_record(
        sink.pool,
        sink.source,
        response.status().as_u16(),
        RequestContext {
            method,
            path,
            request_id,
            user_id,
        },
        entry,
    );

    response
}
