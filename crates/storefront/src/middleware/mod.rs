//! HTTP middleware stack for the storefront.
//!
//! # Order (outermost first)
//!
//! 1. Sentry layers
//! 2. `TraceLayer`
//! 3. Request ID
//! 4. Security headers
//! 5. Session layer
//! 6. Error log (reads the session and request id)
//! 7. Rate limiting on auth and webhook routes

pub mod auth;
pub mod error_log;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, safe_next, set_current_user};
pub use error_log::{ErrorLogSink, error_log_middleware};
pub use rate_limit::{auth_rate_limiter, client_ip, webhook_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
