//! Persisted request failures for admin review.

use chrono::{DateTime, Utc};

use vivero_core::{ErrorLogId, UserId};

/// A stored error-log row.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    pub id: ErrorLogId,
    /// Which app recorded it: "storefront" or "admin".
    pub source: String,
    pub method: String,
    pub path: String,
    pub status: i32,
    pub message: String,
    pub detail: Option<String>,
    pub request_id: Option<String>,
    pub user_id: Option<UserId>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A failure about to be recorded.
#[derive(Debug, Clone)]
pub struct NewErrorLog {
    pub source: &'static str,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub message: String,
    pub detail: Option<String>,
    pub request_id: Option<String>,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Default)]
pub struct ErrorLogFilter {
    /// Include resolved rows too.
    pub include_resolved: bool,
    pub page: u32,
}
