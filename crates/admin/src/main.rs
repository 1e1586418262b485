//! Vivero admin: the back-office on port 3001.
//!
//! Serves HTTPS directly when `ADMIN_TLS_CERT` and `ADMIN_TLS_KEY` are set,
//! plain HTTP otherwise. Migrations are not run here; use `vivero-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::time::Duration;

use axum_server::Handle;
use axum_server::tls_rustls::RustlsConfig;
use secrecy::ExposeSecret;

use vivero_admin::app;
use vivero_admin::config::AdminConfig;
use vivero_admin::state::AppState;
use vivero_storefront::db;
use vivero_storefront::telemetry::{init_sentry, init_tracing, shutdown_signal};

#[tokio::main]
async fn main() {
    // Must happen before any TLS operation.
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = AdminConfig::from_env().expect("Failed to load configuration");

    // Admin events may carry staff emails for debugging.
    let _sentry_guard = init_sentry(&config.sentry, true);
    init_tracing("vivero_admin=info,vivero_storefront=info,tower_http=debug");

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    let addr = config.socket_addr();
    let tls = config.tls.clone();
    let state = AppState::new(config, pool).expect("Failed to initialize application state");
    let service = app(state).into_make_service_with_connect_info::<SocketAddr>();

    if let Some(tls) = tls {
        let rustls_config = RustlsConfig::from_pem(
            tls.cert_pem.into_bytes(),
            tls.key_pem.expose_secret().as_bytes().to_vec(),
        )
        .await
        .expect("Failed to load TLS certificates");

        let handle = Handle::new();
        let shutdown_handle = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(Some(Duration::from_secs(30)));
        });

        tracing::info!("admin listening on https://{}", addr);
        axum_server::bind_rustls(addr, rustls_config)
            .handle(handle)
            .serve(service)
            .await
            .expect("Server error");
    } else {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind to address");
        tracing::info!("admin listening on http://{}", addr);

        axum::serve(listener, service)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .expect("Server error");
    }
}
