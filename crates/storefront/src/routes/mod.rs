//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              Home: enabled slides + featured products
//! GET  /products                      Catalog (?category=&q=&page=)
//! GET  /products/{slug}               Product detail
//! GET  /services                      Services the nursery offers
//!
//! # Cart (login required)
//! GET  /cart                          Cart page
//! POST /cart/add | /cart/update | /cart/remove
//! GET  /cart/count                    Header badge fragment
//!
//! # Checkout (login required)
//! GET  /checkout                      Order form
//! POST /checkout                      Place order
//! GET  /checkout/return               Payment gateway back URL
//!
//! # Account (login required)
//! GET  /account                       Profile + recent orders
//! POST /account/profile | /account/password
//! GET  /account/orders | /account/orders/{id}
//! POST /account/orders/{id}/cancel
//! GET  /account/addresses | /account/addresses/new | /account/addresses/{id}/edit
//! POST /account/addresses | /account/addresses/{id}
//! POST /account/addresses/{id}/delete | /account/addresses/{id}/default
//!
//! # Auth
//! GET  /auth/login | POST /auth/login
//! GET  /auth/register | POST /auth/register
//! POST /auth/logout
//!
//! # Webhooks
//! POST /webhooks/payments             Payment gateway notifications
//!
//! GET  /health | /health/ready
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod home;
pub mod products;
pub mod views;
pub mod webhooks;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, webhook_rate_limiter};
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(auth_rate_limiter())),
        )
        .route(
            "/register",
            get(auth::register_page).merge(post(auth::register).layer(auth_rate_limiter())),
        )
        .route("/logout", post(auth::logout))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::place_order))
        .route("/return", get(checkout::payment_return))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route("/profile", post(account::update_profile))
        .route("/password", post(account::change_password))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order))
        .route("/orders/{id}/cancel", post(account::cancel_order))
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route("/addresses/new", get(account::new_address))
        .route("/addresses/{id}", post(account::update_address))
        .route("/addresses/{id}/edit", get(account::edit_address))
        .route("/addresses/{id}/delete", post(account::delete_address))
        .route("/addresses/{id}/default", post(account::set_default_address))
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/payments", post(webhooks::payments))
        .layer(webhook_rate_limiter())
}

/// Every storefront route, without the middleware stack.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/services", get(home::services))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/account", account_routes())
        .nest("/auth", auth_routes())
        .nest("/webhooks", webhook_routes())
}
