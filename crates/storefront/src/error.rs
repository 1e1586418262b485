//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are sent
//! to Sentry and tagged with an [`ErrorLogEntry`] so the error-log middleware
//! stores them for the admin panel. Clients only see a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::{CheckoutError, ErrorLogEntry, OrderError, PaymentError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Payment gateway call failed.
    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Template(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Payment(PaymentError::InvalidSignature(_)) => StatusCode::UNAUTHORIZED,
            Self::Payment(PaymentError::InvalidPaymentId(_)) => StatusCode::BAD_REQUEST,
            Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                e if e.is_user_error() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(err) => match err {
                CheckoutError::Payment(_) => StatusCode::BAD_GATEWAY,
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CheckoutError::OutOfStock(_) => StatusCode::CONFLICT,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Order(err) => match err {
                OrderError::NotFound => StatusCode::NOT_FOUND,
                OrderError::NotCancellable(_) | OrderError::InvalidTransition { .. } => {
                    StatusCode::CONFLICT
                }
                OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message safe to show to the client.
    fn public_message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            return if status == StatusCode::BAD_GATEWAY {
                "External service error".to_owned()
            } else {
                "Internal server error".to_owned()
            };
        }
        match self {
            Self::Auth(AuthError::InvalidCredentials | AuthError::UserNotFound) => {
                "Invalid credentials".to_owned()
            }
            Self::Auth(AuthError::UserAlreadyExists) => {
                "An account with this email already exists".to_owned()
            }
            Self::Payment(PaymentError::InvalidSignature(_)) => "Invalid signature".to_owned(),
            Self::Payment(PaymentError::InvalidPaymentId(_)) => "Invalid payment id".to_owned(),
            _ => self.to_string(),
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
                "Request error"
            );
        }

        let message = self.public_message(status);
        let mut response = (status, message.clone()).into_response();
        if status.is_server_error() {
            response
                .extensions_mut()
                .insert(ErrorLogEntry::new(message, self.to_string()));
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with a logged-in user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a customer action, shown in later Sentry reports.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use vivero_core::OrderStatus;

    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("monstera".to_string());
        assert_eq!(err.to_string(), "Not found: monstera");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            status_of(AppError::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::BadRequest("quantity".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Internal("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::Payment(PaymentError::InvalidSignature(
                "signature mismatch".into()
            ))),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Payment(PaymentError::InvalidPaymentId("x".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Order(OrderError::NotCancellable(OrderStatus::Shipped))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Checkout(CheckoutError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_server_errors_carry_log_entry() {
        let response = AppError::Internal("db exploded".to_string()).into_response();
        let entry = response.extensions().get::<ErrorLogEntry>();
        assert!(entry.is_some_and(|e| e.message == "Internal server error"
            && e.detail.as_deref() == Some("Internal error: db exploded")));

        let response = AppError::NotFound("x".to_string()).into_response();
        assert!(response.extensions().get::<ErrorLogEntry>().is_none());
    }
}
