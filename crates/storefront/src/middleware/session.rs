//! Session layer backed by `PostgreSQL` through tower-sessions.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

pub const SESSION_COOKIE_NAME: &str = "vivero_session";

/// Sessions expire after 7 days without activity.
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Build the session layer. The `tower_sessions.session` table is created by
/// `vivero-cli migrate`.
///
/// Cookies are marked `Secure` when `base_url` is HTTPS.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    cookie_name: &'static str,
    base_url: &str,
) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());
    let is_secure = base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(cookie_name)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
