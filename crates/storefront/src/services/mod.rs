//! Business logic shared by the storefront and the admin panel.
//!
//! Services sit between route handlers and repositories. Most borrow the pool
//! and any clients they need for the duration of one request.

pub mod auth;
pub mod cache;
pub mod captcha;
pub mod checkout;
pub mod email;
pub mod error_log;
pub mod orders;
pub mod payments;

pub use auth::{AuthError, AuthService, Registration};
pub use cache::CatalogCache;
pub use captcha::{CaptchaError, CaptchaVerifier};
pub use checkout::{CheckoutError, CheckoutForm, CheckoutService, PlacedOrder};
pub use email::{EmailError, EmailService};
pub use error_log::{ErrorLogEntry, RequestContext};
pub use orders::{OrderError, OrderService};
pub use payments::{MercadoPagoClient, PaymentError, PaymentStatus};
