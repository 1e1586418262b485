//! End-to-end tests against a running storefront.
//!
//! These tests require:
//! - A migrated and seeded database (`vivero-cli migrate`, `vivero-cli seed`)
//! - The storefront running (cargo run -p vivero-storefront)
//! - No `RECAPTCHA_SECRET_KEY` set, so forms skip the CAPTCHA
//!
//! Run with: cargo test -p vivero-integration-tests -- --ignored

use reqwest::{StatusCode, header};
use vivero_integration_tests::{session_client, storefront_base_url, unique_email};

const PASSWORD: &str = "correct-horse-battery";

async fn register(client: &reqwest::Client, email: &str) {
    let resp = client
        .post(format!("{}/auth/register", storefront_base_url()))
        .form(&[
            ("name", "Cliente de Prueba"),
            ("email", email),
            ("password", PASSWORD),
            ("password_confirm", PASSWORD),
        ])
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_public_pages() {
    let client = session_client();
    let base_url = storefront_base_url();

    for path in ["/", "/products", "/services", "/health", "/health/ready"] {
        let resp = client
            .get(format!("{base_url}{path}"))
            .send()
            .await
            .expect("Failed to fetch page");
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_unknown_product_is_404() {
    let resp = session_client()
        .get(format!("{}/products/no-such-plant", storefront_base_url()))
        .send()
        .await
        .expect("Failed to fetch product");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_cart_needs_login() {
    let resp = session_client()
        .get(format!("{}/cart", storefront_base_url()))
        .send()
        .await
        .expect("Failed to fetch cart");

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp.headers()[header::LOCATION].to_str().unwrap_or_default();
    assert!(location.starts_with("/auth/login"));
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_register_then_account() {
    let client = session_client();
    let base_url = storefront_base_url();
    register(&client, &unique_email()).await;

    let resp = client
        .get(format!("{base_url}/account"))
        .send()
        .await
        .expect("Failed to fetch account");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Cliente de Prueba"));
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_duplicate_registration_rejected() {
    let email = unique_email();
    register(&session_client(), &email).await;

    let resp = session_client()
        .post(format!("{}/auth/register", storefront_base_url()))
        .form(&[
            ("name", "Otra Persona"),
            ("email", email.as_str()),
            ("password", PASSWORD),
            ("password_confirm", PASSWORD),
        ])
        .send()
        .await
        .expect("Failed to register");

    let location = resp.headers()[header::LOCATION].to_str().unwrap_or_default();
    assert!(location.contains("error="));
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_webhook_acknowledges_other_topics() {
    let resp = session_client()
        .post(format!(
            "{}/webhooks/payments?type=merchant_order&data.id=1",
            storefront_base_url()
        ))
        .send()
        .await
        .expect("Failed to post webhook");
    assert_eq!(resp.status(), StatusCode::OK);
}
