//! Vivero storefront: the public shop on port 3000.
//!
//! Migrations are not run here; use `vivero-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use vivero_storefront::config::StorefrontConfig;
use vivero_storefront::state::AppState;
use vivero_storefront::telemetry::{init_sentry, init_tracing, shutdown_signal};
use vivero_storefront::{app, db};

#[tokio::main]
async fn main() {
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Sentry first so the tracing layer has a client to report to.
    let _sentry_guard = init_sentry(&config.sentry, false);
    init_tracing("vivero_storefront=info,tower_http=debug");

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    let addr = config.socket_addr();
    let state = AppState::new(config, pool).expect("Failed to initialize application state");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!("storefront listening on {}", addr);

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}
