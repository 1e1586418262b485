//! End-to-end tests against a running admin panel.
//!
//! These tests require:
//! - A migrated and seeded database
//! - The admin panel running (cargo run -p vivero-admin)
//! - An account promoted with `vivero-cli admin promote`, whose credentials
//!   are in `ADMIN_TEST_EMAIL` and `ADMIN_TEST_PASSWORD`
//!
//! Run with: cargo test -p vivero-integration-tests -- --ignored

use reqwest::{Client, StatusCode, header};
use vivero_integration_tests::{admin_base_url, session_client};

fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

/// Log in with the test admin account.
async fn authenticated_client() -> Client {
    let email = std::env::var("ADMIN_TEST_EMAIL").expect("ADMIN_TEST_EMAIL not set");
    let password = std::env::var("ADMIN_TEST_PASSWORD").expect("ADMIN_TEST_PASSWORD not set");

    let client = session_client();
    let resp = client
        .post(format!("{}/auth/login", admin_base_url()))
        .form(&[("email", email.as_str()), ("password", password.as_str())])
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(location(&resp), "/", "admin login failed");
    client
}

// ============================================================================
// Access control
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin panel and database"]
async fn test_pages_require_login() {
    let client = session_client();
    for path in ["/", "/products", "/orders", "/users", "/errors"] {
        let resp = client
            .get(format!("{}{path}", admin_base_url()))
            .send()
            .await
            .expect("Failed to fetch page");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&resp), "/auth/login");
    }
}

#[tokio::test]
#[ignore = "Requires running admin panel and database"]
async fn test_wrong_password_rejected() {
    let resp = session_client()
        .post(format!("{}/auth/login", admin_base_url()))
        .form(&[("email", "nobody@vivero-tests.com"), ("password", "wrong")])
        .send()
        .await
        .expect("Failed to post login");
    assert_eq!(location(&resp), "/auth/login?error=invalid_credentials");
}

// ============================================================================
// Back-office pages
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin panel, database and admin credentials"]
async fn test_sections_render() {
    let client = authenticated_client().await;
    for path in [
        "/",
        "/products",
        "/products/new",
        "/orders",
        "/orders?status=pending",
        "/users",
        "/slides",
        "/services",
        "/errors?all=1",
    ] {
        let resp = client
            .get(format!("{}{path}", admin_base_url()))
            .send()
            .await
            .expect("Failed to fetch page");
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running admin panel, database and admin credentials"]
async fn test_product_without_price_bounces_back() {
    let client = authenticated_client().await;
    let form = reqwest::multipart::Form::new()
        .text("name", "Ficus lyrata")
        .text("category", "interior");

    let resp = client
        .post(format!("{}/products", admin_base_url()))
        .multipart(form)
        .send()
        .await
        .expect("Failed to post product");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/products/new?error="));
}

#[tokio::test]
#[ignore = "Requires running admin panel, database and admin credentials"]
async fn test_logout_ends_session() {
    let client = authenticated_client().await;
    let resp = client
        .post(format!("{}/auth/logout", admin_base_url()))
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(location(&resp), "/auth/login");

    let resp = client
        .get(format!("{}/", admin_base_url()))
        .send()
        .await
        .expect("Failed to fetch dashboard");
    assert_eq!(location(&resp), "/auth/login");
}
