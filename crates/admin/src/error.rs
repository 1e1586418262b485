//! Unified error handling for admin.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use vivero_storefront::db::RepositoryError;
use vivero_storefront::services::{AuthError, ErrorLogEntry, OrderError};

use crate::services::UploadError;

/// Application-level error type for the admin panel.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Image CDN upload failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Template(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(e) if e.is_user_error() => StatusCode::UNAUTHORIZED,
            Self::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Order(OrderError::NotFound) => StatusCode::NOT_FOUND,
            Self::Order(OrderError::Repository(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Order(_) => StatusCode::CONFLICT,
            Self::Upload(e) if e.is_user_error() => StatusCode::BAD_REQUEST,
            Self::Upload(_) => StatusCode::BAD_GATEWAY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if status == StatusCode::BAD_GATEWAY {
            "External service error".to_string()
        } else if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let mut response = (status, message.clone()).into_response();
        if status.is_server_error() {
            response
                .extensions_mut()
                .insert(ErrorLogEntry::new(message, self.to_string()));
        }
        response
    }
}

/// Set the Sentry user context from an admin user.
pub fn set_sentry_user(admin_user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(admin_user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order 123".to_string());
        assert_eq!(err.to_string(), "Not found: order 123");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("unknown role".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Upload(UploadError::TooLarge)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Upload(UploadError::Parse("bad json".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_errors_hide_details_and_carry_log_entry() {
        let response = AppError::Internal("connection refused".to_string()).into_response();
        assert!(response.extensions().get::<ErrorLogEntry>().is_some());

        let response = AppError::BadRequest("missing name".to_string()).into_response();
        assert!(response.extensions().get::<ErrorLogEntry>().is_none());
    }
}
