//! Persisting failed requests for admin review.
//!
//! `AppError` attaches an [`ErrorLogEntry`] to the responses it builds. The
//! middleware in `crate::middleware::error_log` picks it up after the handler
//! returns, fills in request details and writes the row from a spawned task.

use sqlx::PgPool;

use vivero_core::UserId;

use crate::db::ErrorLogRepository;
use crate::models::NewErrorLog;

/// Response extension describing a failure worth recording.
#[derive(Debug, Clone)]
pub struct ErrorLogEntry {
    /// Safe summary, e.g. "Database error".
    pub message: String,
    /// Full error chain; only shown in the admin panel.
    pub detail: Option<String>,
}

impl ErrorLogEntry {
    #[must_use]
    pub fn new(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }
}

/// Request details the middleware collects.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
    pub request_id: Option<String>,
    pub user_id: Option<UserId>,
}

/// Write an entry without blocking the response.
pub fn spawn_record(
    pool: PgPool,
    source: &'static str,
    status: u16,
    context: RequestContext,
    entry: ErrorLogEntry,
) {
    tokio::spawn(async move {
        let row = NewErrorLog {
            source,
            method: context.method,
            path: context.path,
            status,
            message: entry.message,
            detail: entry.detail,
            request_id: context.request_id,
            user_id: context.user_id,
        };
        if let Err(e) = ErrorLogRepository::new(&pool).record(&row).await {
            tracing::warn!(error = %e, "failed to record error log entry");
        }
    });
}
