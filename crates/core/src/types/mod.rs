//! Core types for Vivero.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod checkout;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use checkout::{
    CartLine, CheckoutRuleError, MAX_LINE_QUANTITY, order_subtotal, order_total, validate_line,
    validate_quantity,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use status::*;
