//! HTTP middleware stack for admin.
//!
//! # Order (outermost first)
//!
//! 1. Sentry layers
//! 2. `TraceLayer`
//! 3. Request ID (shared with the storefront)
//! 4. Security headers (stricter CSP for admin)
//! 5. Session layer
//! 6. Error log, source "admin"
//!
//! Handlers require a logged-in admin through [`RequireAdminAuth`].

pub mod auth;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalAdminAuth, RequireAdminAuth, clear_current_admin, set_current_admin,
};
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
pub use vivero_storefront::middleware::{
    ErrorLogSink, auth_rate_limiter, error_log_middleware, request_id_middleware,
};
