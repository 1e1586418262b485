//! Database operations for the `store` schema.
//!
//! # Tables
//!
//! - `users`, `addresses` - accounts and saved shipping addresses
//! - `products`, `hero_slides`, `services` - catalog and home-page content
//! - `cart_items` - per-user cart rows, resolved against `products` on read
//! - `orders`, `order_items` - checkout snapshots
//! - `app_error_log` - failed requests for admin review
//!
//! Sessions live in the `tower_sessions` schema managed by the session store.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p vivero-cli -- migrate
//! ```

pub mod addresses;
pub mod carts;
pub mod error_logs;
pub mod orders;
pub mod products;
pub mod services;
pub mod slides;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use addresses::AddressRepository;
pub use carts::CartRepository;
pub use error_logs::ErrorLogRepository;
pub use orders::{OrderRepository, StatusChange};
pub use products::ProductRepository;
pub use services::ServiceRepository;
pub use slides::SlideRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value failed to parse into its domain type.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    #[error("not found")]
    NotFound,

    /// Constraint violation or a conditional update that matched nothing.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique-constraint violation to `Conflict(message)`.
    pub(crate) fn unique_or(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }

    /// Map a foreign-key violation to `Conflict(message)`.
    pub(crate) fn foreign_key_or(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_foreign_key_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Convert a non-negative database integer to `u32`.
pub(crate) fn to_u32(value: i32, what: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {what}: {value}")))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
