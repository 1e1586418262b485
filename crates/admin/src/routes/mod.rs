//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health | /health/ready         Health checks
//!
//! GET  /                               Dashboard
//!
//! GET  /auth/login | POST /auth/login  Email + password, admin role only
//! POST /auth/logout
//!
//! GET  /products                       List (?state=&q=&page=)
//! GET  /products/new | POST /products
//! GET  /products/{id}/edit | POST /products/{id}
//! POST /products/{id}/delete
//!
//! GET  /orders                         List (?status=&q=&page=)
//! GET  /orders/{id}                    Detail
//! POST /orders/{id}/status | /orders/{id}/cancel
//!
//! GET  /users                          List (?role=&q=&page=)
//! GET  /users/{id}                     Detail + order history
//! POST /users/{id}/role | /users/{id}/delete
//!
//! GET  /slides | /slides/new | /slides/{id}/edit
//! POST /slides | /slides/{id} | /slides/{id}/toggle | /slides/{id}/delete
//!
//! GET  /services | /services/new | /services/{id}/edit
//! POST /services | /services/{id} | /services/{id}/delete
//!
//! GET  /errors                         Error log (?all=1&page=)
//! POST /errors/{id}/resolve | /errors/purge
//! ```

pub mod auth;
pub mod dashboard;
pub mod errors;
pub mod form;
pub mod health;
pub mod orders;
pub mod products;
pub mod services;
pub mod slides;
pub mod users;
pub mod views;

use axum::{Router, routing::get};

use crate::state::AppState;

/// All admin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/", get(dashboard::dashboard))
        .merge(auth::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(users::router())
        .merge(slides::router())
        .merge(services::router())
        .merge(errors::router())
}
