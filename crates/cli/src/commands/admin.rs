//! Back-office access management.
//!
//! The account must already exist; customers register on the storefront and
//! are then promoted from here. Promotion takes effect on their next admin
//! login.

use thiserror::Error;
use vivero_core::{Email, UserRole};
use vivero_storefront::db::{RepositoryError, UserRepository};

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("No account registered with email: {0}")]
    UserNotFound(String),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(RepositoryError),
}

pub async fn promote(email: &str) -> Result<(), AdminError> {
    set_role(email, UserRole::Admin).await
}

pub async fn demote(email: &str) -> Result<(), AdminError> {
    set_role(email, UserRole::Customer).await
}

async fn set_role(email: &str, role: UserRole) -> Result<(), AdminError> {
    // Validate before touching the database.
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let pool = connect().await?;

    let user = UserRepository::new(&pool)
        .set_role_by_email(&email, role)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UserNotFound(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(user_id = %user.id, email = %user.email, role = %user.role, "Role updated");
    Ok(())
}
