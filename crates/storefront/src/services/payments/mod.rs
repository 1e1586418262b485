//! MercadoPago payment gateway integration.
//!
//! Checkout creates a preference and redirects the customer to the gateway.
//! The gateway later calls `/webhooks/payments`; the handler checks the
//! signature, fetches the payment, and maps its status onto the order.

mod client;
mod signature;

pub use client::{MercadoPagoClient, Payment, Preference, PreferenceItem, PreferencePayer};
pub use signature::{SignatureHeader, sign, verify_signature};

use thiserror::Error;

use vivero_core::OrderStatus;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid payment id: {0}")]
    InvalidPaymentId(String),
}

/// Payment status as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
    Approved,
    Pending,
    InProcess,
    Authorized,
    InMediation,
    Rejected,
    Cancelled,
    Refunded,
    ChargedBack,
    Other(String),
}

impl PaymentStatus {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "approved" => Self::Approved,
            "pending" => Self::Pending,
            "in_process" => Self::InProcess,
            "authorized" => Self::Authorized,
            "in_mediation" => Self::InMediation,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            "charged_back" => Self::ChargedBack,
            other => Self::Other(other.to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Approved => "approved",
            Self::Pending => "pending",
            Self::InProcess => "in_process",
            Self::Authorized => "authorized",
            Self::InMediation => "in_mediation",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::ChargedBack => "charged_back",
            Self::Other(s) => s,
        }
    }

    /// Order status this payment status moves the order to.
    ///
    /// Failed, refunded and disputed payments return `None`: they are
    /// recorded on the order and left for staff to act on.
    #[must_use]
    pub const fn order_status(&self) -> Option<OrderStatus> {
        match self {
            Self::Approved => Some(OrderStatus::Confirmed),
            Self::Pending | Self::InProcess | Self::Authorized => {
                Some(OrderStatus::PendingPayment)
            }
            _ => None,
        }
    }
}

/// The `data.id` a notification refers to, validated as a gateway payment id.
///
/// # Errors
///
/// Returns `PaymentError::InvalidPaymentId` unless the id is 1 to 32 ASCII
/// digits.
pub fn parse_payment_id(raw: &str) -> Result<&str, PaymentError> {
    let id = raw.trim();
    if id.is_empty() || id.len() > 32 || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PaymentError::InvalidPaymentId(raw.to_owned()));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            PaymentStatus::parse("approved").order_status(),
            Some(OrderStatus::Confirmed)
        );
        for pending in ["pending", "in_process", "authorized"] {
            assert_eq!(
                PaymentStatus::parse(pending).order_status(),
                Some(OrderStatus::PendingPayment)
            );
        }
        for failed in ["rejected", "cancelled", "refunded", "charged_back", "whatever"] {
            assert_eq!(PaymentStatus::parse(failed).order_status(), None);
        }
    }

    #[test]
    fn test_status_round_trips_unknown_values() {
        assert_eq!(PaymentStatus::parse("in_mediation").as_str(), "in_mediation");
        assert_eq!(PaymentStatus::parse("new_status").as_str(), "new_status");
    }

    #[test]
    fn test_parse_payment_id() {
        assert_eq!(parse_payment_id(" 123456789 ").ok(), Some("123456789"));
        assert!(parse_payment_id("").is_err());
        assert!(parse_payment_id("12ab").is_err());
        assert!(parse_payment_id("1; DROP TABLE").is_err());
        assert!(parse_payment_id(&"9".repeat(33)).is_err());
    }
}
