//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::MissingField;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] vivero_core::EmailError),

    #[error(transparent)]
    MissingField(#[from] MissingField),

    #[error("invalid phone number")]
    InvalidPhone,

    /// Wrong password or unknown email; the two are never distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("user already exists")]
    UserAlreadyExists,

    #[error("password validation failed: {0}")]
    WeakPassword(String),

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Short code carried in `?error=` redirects.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "invalid_email",
            Self::MissingField(_) => "missing_fields",
            Self::InvalidPhone => "invalid_phone",
            Self::InvalidCredentials | Self::UserNotFound => "invalid_credentials",
            Self::UserAlreadyExists => "email_taken",
            Self::WeakPassword(_) => "weak_password",
            Self::PasswordMismatch => "password_mismatch",
            Self::Repository(_) | Self::PasswordHash => "server_error",
        }
    }

    /// Whether this is the user's mistake rather than a server failure.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Repository(_) | Self::PasswordHash)
    }
}
