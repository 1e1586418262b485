//! Status enums for catalog, orders and users.
//!
//! Each enum maps to a Postgres enum type in the `store` schema when the
//! `postgres` feature is enabled, and serializes as `snake_case` everywhere.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing a status enum from a string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

impl ParseStatusError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum.
macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The `snake_case` database / form value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseStatusError::new($kind, s)),
                }
            }
        }
    };
}

// =============================================================================
// Products
// =============================================================================

/// Catalog visibility of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "store.product_state", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ProductState {
    /// Listed and purchasable.
    #[default]
    Active,
    /// Hidden from the storefront.
    Inactive,
    /// Out of stock; still listed but cannot be added to a cart.
    Sold,
}

string_enum!(ProductState, "product state", {
    Active => "active",
    Inactive => "inactive",
    Sold => "sold",
});

impl ProductState {
    /// Whether customers may add the product to a cart.
    #[must_use]
    pub const fn is_purchasable(self) -> bool {
        matches!(self, Self::Active)
    }

    /// State after the stock level changed to `stock`.
    ///
    /// Running out marks a product sold; restocking a sold product reactivates
    /// it. Inactive products stay hidden regardless of stock.
    #[must_use]
    pub const fn after_stock_change(self, stock: i32) -> Self {
        match self {
            Self::Inactive => Self::Inactive,
            _ if stock <= 0 => Self::Sold,
            Self::Sold | Self::Active => Self::Active,
        }
    }

    /// Human-readable label for the admin panel.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Activo",
            Self::Inactive => "Inactivo",
            Self::Sold => "Agotado",
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Lifecycle status of an order.
///
/// ```text
/// pending ──► pending_payment ──────┐
///    │    └─► pending_confirmation ─┤
///    └──────────────────────────────┴─► confirmed ─► shipped ─► delivered
///
/// any non-shipped status ─► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "store.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    PendingPayment,
    PendingConfirmation,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

string_enum!(OrderStatus, "order status", {
    Pending => "pending",
    PendingPayment => "pending_payment",
    PendingConfirmation => "pending_confirmation",
    Confirmed => "confirmed",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Whether an order in this status may move to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (
                Self::Pending,
                Self::PendingPayment
                | Self::PendingConfirmation
                | Self::Confirmed
                | Self::Cancelled,
            )
            | (
                Self::PendingPayment | Self::PendingConfirmation,
                Self::Confirmed | Self::Cancelled,
            )
            | (Self::PendingPayment, Self::PendingConfirmation)
            | (Self::Confirmed, Self::Shipped | Self::Cancelled)
            | (Self::Shipped, Self::Delivered) => true,
            _ => false,
        }
    }

    /// Statuses reachable from this one, in lifecycle order.
    #[must_use]
    pub fn next_statuses(self) -> Vec<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }

    /// Customers may cancel their own order until it is confirmed.
    #[must_use]
    pub const fn is_cancellable_by_customer(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::PendingPayment | Self::PendingConfirmation
        )
    }

    /// No further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether the order's total counts as revenue.
    #[must_use]
    pub const fn counts_as_revenue(self) -> bool {
        matches!(self, Self::Confirmed | Self::Shipped | Self::Delivered)
    }

    /// Human-readable label shown to customers and admins.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pendiente",
            Self::PendingPayment => "Pago pendiente",
            Self::PendingConfirmation => "Esperando confirmación",
            Self::Confirmed => "Confirmado",
            Self::Shipped => "Enviado",
            Self::Delivered => "Entregado",
            Self::Cancelled => "Cancelado",
        }
    }
}

/// How the customer pays for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "store.payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Paid in cash on pickup or delivery.
    Cash,
    /// Bank transfer, confirmed manually by an admin.
    BankTransfer,
    /// Online payment through the MercadoPago checkout.
    MercadoPago,
}

string_enum!(PaymentMethod, "payment method", {
    Cash => "cash",
    BankTransfer => "bank_transfer",
    MercadoPago => "mercado_pago",
});

impl PaymentMethod {
    /// Status a freshly placed order starts in.
    #[must_use]
    pub const fn initial_order_status(self) -> OrderStatus {
        match self {
            Self::Cash => OrderStatus::Pending,
            Self::BankTransfer => OrderStatus::PendingConfirmation,
            Self::MercadoPago => OrderStatus::PendingPayment,
        }
    }

    /// Whether checkout must redirect the customer to the payment gateway.
    #[must_use]
    pub const fn uses_gateway(self) -> bool {
        matches!(self, Self::MercadoPago)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cash => "Efectivo",
            Self::BankTransfer => "Transferencia bancaria",
            Self::MercadoPago => "Mercado Pago",
        }
    }
}

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "store.delivery_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    /// Collected at the nursery.
    #[default]
    Pickup,
    /// Shipped to one of the customer's addresses.
    Shipping,
}

string_enum!(DeliveryMethod, "delivery method", {
    Pickup => "pickup",
    Shipping => "shipping",
});

impl DeliveryMethod {
    /// Shipping needs a delivery address.
    #[must_use]
    pub const fn requires_address(self) -> bool {
        matches!(self, Self::Shipping)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pickup => "Retiro en vivero",
            Self::Shipping => "Envío a domicilio",
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// Role of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "store.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    /// Full access to the back-office.
    Admin,
}

string_enum!(UserRole, "user role", {
    Customer => "customer",
    Admin => "admin",
});

impl UserRole {
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Customer => "Cliente",
            Self::Admin => "Administrador",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_happy_path() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(PendingPayment));
        assert!(Pending.can_transition_to(PendingConfirmation));
        assert!(PendingPayment.can_transition_to(Confirmed));
        assert!(PendingConfirmation.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
    }

    #[test]
    fn test_lifecycle_rejects_skips_and_reversals() {
        use OrderStatus::*;
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Confirmed.can_transition_to(Confirmed));
    }

    #[test]
    fn test_terminal_statuses_have_no_successors() {
        for status in OrderStatus::ALL {
            assert_eq!(status.is_terminal(), status.next_statuses().is_empty());
        }
    }

    #[test]
    fn test_customer_cancellation_window() {
        assert!(OrderStatus::Pending.is_cancellable_by_customer());
        assert!(OrderStatus::PendingPayment.is_cancellable_by_customer());
        assert!(!OrderStatus::Confirmed.is_cancellable_by_customer());
        assert!(!OrderStatus::Cancelled.is_cancellable_by_customer());
    }

    #[test]
    fn test_payment_method_initial_status() {
        assert_eq!(
            PaymentMethod::Cash.initial_order_status(),
            OrderStatus::Pending
        );
        assert_eq!(
            PaymentMethod::BankTransfer.initial_order_status(),
            OrderStatus::PendingConfirmation
        );
        assert_eq!(
            PaymentMethod::MercadoPago.initial_order_status(),
            OrderStatus::PendingPayment
        );
    }

    #[test]
    fn test_stock_change_updates_state() {
        assert_eq!(ProductState::Active.after_stock_change(0), ProductState::Sold);
        assert_eq!(ProductState::Sold.after_stock_change(4), ProductState::Active);
        assert_eq!(ProductState::Active.after_stock_change(4), ProductState::Active);
        assert_eq!(
            ProductState::Inactive.after_stock_change(0),
            ProductState::Inactive
        );
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(OrderStatus::PendingConfirmation.to_string(), "pending_confirmation");
        assert_eq!(
            "mercado_pago".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::MercadoPago
        );
        assert!("refunded".parse::<OrderStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&OrderStatus::PendingPayment).unwrap(),
            "\"pending_payment\""
        );
    }
}
