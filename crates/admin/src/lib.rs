//! Vivero admin library.
//!
//! The back-office for staff: catalog, carousel and services editors, order
//! fulfilment, accounts and the persisted error log. It shares the database
//! layer and business services with the storefront crate.
//!
//! # Security
//!
//! Every page except login and the health checks requires a session created
//! by an account with the `admin` role. Deploy behind a private network.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, middleware::from_fn, middleware::from_fn_with_state};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use vivero_storefront::models::session_keys;

use crate::middleware::{
    ErrorLogSink, create_session_layer, error_log_middleware, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// The admin application with its full middleware stack.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());
    let sink = ErrorLogSink {
        pool: state.pool().clone(),
        source: "admin",
        session_key: session_keys::CURRENT_ADMIN,
    };

    Router::new()
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new("crates/admin/static"))
        .layer(from_fn_with_state(sink, error_log_middleware))
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                        request_id = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use vivero_storefront::config::{EmailConfig, SentryConfig};

    use super::*;
    use crate::config::{AdminConfig, CloudinaryConfig};

    fn test_app() -> Router {
        let config = AdminConfig {
            database_url: SecretString::from("postgres://localhost/vivero_test"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3001,
            base_url: "http://localhost:3001".to_owned(),
            session_secret: SecretString::from("b".repeat(64)),
            storefront_url: "http://localhost:3000".to_owned(),
            store_notification_email: "pedidos@vivero.test".to_owned(),
            cloudinary: CloudinaryConfig {
                cloud_name: "vivero".to_owned(),
                api_key: "1234".to_owned(),
                api_secret: SecretString::from("cdn-secret"),
                folder: "vivero".to_owned(),
            },
            email: EmailConfig {
                smtp_host: "localhost".to_owned(),
                smtp_port: 2525,
                smtp_username: "user".to_owned(),
                smtp_password: SecretString::from("pass"),
                from_address: "Vivero <hola@vivero.test>".to_owned(),
            },
            sentry: SentryConfig::default(),
            tls: None,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/vivero_test")
            .unwrap();
        app(AppState::new(config, pool).unwrap())
    }

    async fn get(uri: &str) -> axum::response::Response {
        test_app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_has_strict_csp() {
        let response = get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let csp = response.headers()[header::CONTENT_SECURITY_POLICY]
            .to_str()
            .unwrap();
        assert!(csp.contains("default-src 'none'"));
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_pages_redirect_to_login_without_session() {
        for uri in ["/", "/orders", "/products/new", "/errors", "/users/1"] {
            let response = get(uri).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(response.headers()[header::LOCATION], "/auth/login");
        }
    }

    #[tokio::test]
    async fn test_login_page_renders() {
        let response = get("/auth/login?error=not_admin").await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
