//! Error-log repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use vivero_core::{ErrorLogId, UserId};

use super::RepositoryError;
use crate::models::{ErrorLog, ErrorLogFilter, NewErrorLog, Page, limit_offset};

#[derive(Debug, sqlx::FromRow)]
struct ErrorLogRow {
    id: i32,
    source: String,
    method: String,
    path: String,
    status: i32,
    message: String,
    detail: Option<String>,
    request_id: Option<String>,
    user_id: Option<i32>,
    resolved: bool,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ErrorLogRow> for ErrorLog {
    fn from(row: ErrorLogRow) -> Self {
        Self {
            id: ErrorLogId::new(row.id),
            source: row.source,
            method: row.method,
            path: row.path,
            status: row.status,
            message: row.message,
            detail: row.detail,
            request_id: row.request_id,
            user_id: row.user_id.map(UserId::new),
            resolved: row.resolved,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
        }
    }
}

pub struct ErrorLogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ErrorLogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(&self, entry: &NewErrorLog) -> Result<ErrorLogId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO store.app_error_log
                 (source, method, path, status, message, detail, request_id, user_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(entry.source)
        .bind(&entry.method)
        .bind(&entry.path)
        .bind(i32::from(entry.status))
        .bind(&entry.message)
        .bind(entry.detail.as_deref())
        .bind(entry.request_id.as_deref())
        .bind(entry.user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(ErrorLogId::new(id))
    }

    /// Newest first; unresolved only unless the filter asks for all.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &ErrorLogFilter,
        per_page: u32,
    ) -> Result<Page<ErrorLog>, RepositoryError> {
        let (limit, offset) = limit_offset(filter.page, per_page);

        let rows: Vec<ErrorLogRow> = sqlx::query_as(
            "SELECT id, source, method, path, status, message, detail, request_id, user_id,
                    resolved, resolved_at, created_at
             FROM store.app_error_log
             WHERE $1 OR NOT resolved
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(filter.include_resolved)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM store.app_error_log WHERE $1 OR NOT resolved",
        )
        .bind(filter.include_resolved)
        .fetch_one(self.pool)
        .await?;

        Ok(Page {
            items: rows.into_iter().map(ErrorLog::from).collect(),
            page: filter.page.max(1),
            per_page,
            total,
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_unresolved(&self) -> Result<i64, RepositoryError> {
        let count =
            sqlx::query_scalar("SELECT COUNT(*) FROM store.app_error_log WHERE NOT resolved")
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn mark_resolved(&self, id: ErrorLogId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE store.app_error_log
             SET resolved = true, resolved_at = COALESCE(resolved_at, now())
             WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete every resolved entry, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_resolved(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM store.app_error_log WHERE resolved")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
