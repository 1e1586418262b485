//! Integration tests for Vivero.
//!
//! # Running Tests
//!
//! ```bash
//! # Domain rules across crates (no services needed)
//! cargo test -p vivero-integration-tests
//!
//! # Live tests against running binaries and a migrated, seeded database
//! cargo test -p vivero-integration-tests -- --ignored
//! ```
//!
//! Live tests read `STOREFRONT_BASE_URL` and `ADMIN_BASE_URL`, and log into
//! the admin panel with `ADMIN_TEST_EMAIL` / `ADMIN_TEST_PASSWORD`.
//! Database tests connect through `STOREFRONT_DATABASE_URL` (or
//! `DATABASE_URL`) to a database migrated with `vivero-cli migrate`.

use reqwest::Client;
use sqlx::PgPool;

use vivero_storefront::config::get_database_url;
use vivero_storefront::db::create_pool;

#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// Client that keeps session cookies and does not follow redirects, so tests
/// can assert on `Location`.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized.
#[must_use]
pub fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// A fresh address for registering throwaway accounts.
#[must_use]
pub fn unique_email() -> String {
    format!("test-{}@vivero-tests.com", uuid::Uuid::new_v4().simple())
}

/// Pool on the migrated test database.
///
/// # Panics
///
/// Panics if no database URL is set or the database is unreachable.
pub async fn database_pool() -> PgPool {
    let url = get_database_url("STOREFRONT_DATABASE_URL").expect("database URL not set");
    create_pool(&url).await.expect("Failed to connect to database")
}

/// A fresh product slug, so tests never collide with seeded data.
#[must_use]
pub fn unique_slug(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}
