//! Vivero storefront library.
//!
//! The public shop (catalog, cart, checkout, customer accounts) plus
//! everything the admin binary and CLI reuse: configuration, the database
//! layer, domain models and business services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;

use axum::{Router, middleware::from_fn, middleware::from_fn_with_state};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{
    ErrorLogSink, SESSION_COOKIE_NAME, create_session_layer, error_log_middleware,
    request_id_middleware, security_headers_middleware,
};
use crate::models::session_keys;
use crate::state::AppState;

/// The storefront application with its full middleware stack.
pub fn app(state: AppState) -> Router {
    let session_layer =
        create_session_layer(state.pool(), SESSION_COOKIE_NAME, &state.config().base_url);
    let sink = ErrorLogSink {
        pool: state.pool().clone(),
        source: "storefront",
        session_key: session_keys::CURRENT_USER,
    };

    Router::new()
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new("crates/storefront/static"))
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
    use rust_decimal::Decimal;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{
        BankTransferConfig, EmailConfig, MercadoPagoConfig, SentryConfig, StorefrontConfig,
    };

    const WEBHOOK_SECRET: &str = "whsec-test-0123456789abcdef";

    fn test_config(webhook_secret: Option<&str>) -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/vivero_test"),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            base_url: "http://localhost:3000".to_owned(),
            session_secret: SecretString::from("a".repeat(64)),
            mercadopago: MercadoPagoConfig {
                access_token: SecretString::from("TEST-token"),
                webhook_secret: webhook_secret.map(SecretString::from),
                api_base: "http://127.0.0.1:9".to_owned(),
            },
            email: EmailConfig {
                smtp_host: "localhost".to_owned(),
                smtp_port: 2525,
                smtp_username: "user".to_owned(),
                smtp_password: SecretString::from("pass"),
                from_address: "Vivero <hola@vivero.test>".to_owned(),
            },
            recaptcha: None,
            bank_transfer: BankTransferConfig::default(),
            store_notification_email: "pedidos@vivero.test".to_owned(),
            shipping_cost: Decimal::new(2_500, 0),
            sentry: SentryConfig::default(),
        }
    }

    fn test_app(webhook_secret: Option<&str>) -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/vivero_test")
            .unwrap();
        app(AppState::new(test_config(webhook_secret), pool).unwrap())
    }

    #[tokio::test]
    async fn test_health_sets_security_headers_and_request_id() {
        let response = test_app(None)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .contains_key(header::CONTENT_SECURITY_POLICY)
        );
        assert_eq!(response.headers()["x-request-id"], "req-123");
    }

    #[tokio::test]
    async fn test_cart_redirects_guests_to_login() {
        let response = test_app(None)
            .oneshot(Request::builder().uri("/cart").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth/login?next=%2Fcart"
        );
    }

    #[tokio::test]
    async fn test_guest_redirect_keeps_nested_path() {
        let response = test_app(None)
            .oneshot(
                Request::builder()
                    .uri("/account/orders")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth/login?next=%2Faccount%2Forders"
        );
    }

    #[tokio::test]
    async fn test_guest_cart_post_returns_to_cart() {
        let response = test_app(None)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/cart/add")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("product_id=1&quantity=1"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth/login?next=%2Fcart"
        );
    }

    #[tokio::test]
    async fn test_webhook_ignores_other_topics() {
        let response = test_app(None)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/payments?type=merchant_order&data.id=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_webhook_rejects_malformed_payment_id() {
        let response = test_app(None)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/payments?type=payment&data.id=..%2Fusers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_webhook_requires_signature_when_secret_set() {
        let app = test_app(Some(WEBHOOK_SECRET));

        let missing = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/payments?type=payment&data.id=123456")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let forged = crate::services::payments::sign("wrong-secret", "req-1", "123456", "1700000000")
            .unwrap();
        let bad = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/webhooks/payments?type=payment&data.id=123456")
                    .header("x-signature", forged)
                    .header("x-request-id", "req-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
    }
}
