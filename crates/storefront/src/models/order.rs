//! Orders and their line items.
//!
//! An order is a snapshot taken at checkout: product names and unit prices are
//! copied onto the items so later catalog edits never change past orders.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use vivero_core::{
    DeliveryMethod, Email, OrderId, OrderItemId, OrderStatus, PaymentMethod, Price, ProductId,
    UserId,
};

/// A placed order.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub delivery_method: DeliveryMethod,
    /// One-line address copied from the chosen saved address.
    pub shipping_address: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
    pub subtotal: Price,
    pub shipping_cost: Price,
    pub total: Price,
    /// Gateway preference id.
    pub payment_reference: Option<String>,
    /// Gateway payment id, set by the webhook.
    pub payment_id: Option<String>,
    /// Raw gateway status string ("approved", "rejected", ...).
    pub payment_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Human order number shown to customers.
    #[must_use]
    pub fn number(&self) -> String {
        format!("#{:06}", self.id.as_i32())
    }

    #[must_use]
    pub const fn can_customer_cancel(&self) -> bool {
        self.status.is_cancellable_by_customer()
    }

    /// Still waiting for the customer to pay through the gateway.
    #[must_use]
    pub const fn awaiting_gateway_payment(&self) -> bool {
        self.payment_method.uses_gateway() && matches!(self.status, OrderStatus::PendingPayment)
    }
}

/// A line on an order.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    /// `None` once the product has been deleted from the catalog.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub unit_price: Price,
    pub quantity: u32,
    pub line_total: Price,
}

/// Everything needed to write an order, already validated and priced.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub payment_method: PaymentMethod,
    pub delivery_method: DeliveryMethod,
    pub shipping_address: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub total: Decimal,
}

impl NewOrder {
    #[must_use]
    pub const fn initial_status(&self) -> OrderStatus {
        self.payment_method.initial_order_status()
    }
}

/// An order row joined with the customer who placed it (admin lists).
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub order: Order,
    pub customer_name: String,
    pub customer_email: Email,
    pub item_count: i64,
}

/// Admin order-list filter.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Matches customer name, customer email or the numeric order id.
    pub search: Option<String>,
    pub page: u32,
}

/// Dashboard figures.
#[derive(Debug, Clone, Default)]
pub struct OrderStats {
    pub by_status: BTreeMap<&'static str, i64>,
    /// Sum of totals of confirmed, shipped and delivered orders.
    pub revenue: Decimal,
}

impl OrderStats {
    /// Count for one status, zero when absent.
    #[must_use]
    pub fn count(&self, status: OrderStatus) -> i64 {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_orders(&self) -> i64 {
        self.by_status.values().sum()
    }

    /// Orders that need staff action: waiting for confirmation or to ship.
    #[must_use]
    pub fn needs_attention(&self) -> i64 {
        self.count(OrderStatus::Pending)
            + self.count(OrderStatus::PendingConfirmation)
            + self.count(OrderStatus::Confirmed)
    }

    #[must_use]
    pub fn revenue_display(&self) -> String {
        Price::ars(self.revenue).display()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_counts() {
        let mut stats = OrderStats::default();
        stats.by_status.insert("pending", 2);
        stats.by_status.insert("confirmed", 3);
        stats.by_status.insert("delivered", 5);
        assert_eq!(stats.count(OrderStatus::Pending), 2);
        assert_eq!(stats.count(OrderStatus::Shipped), 0);
        assert_eq!(stats.total_orders(), 10);
        assert_eq!(stats.needs_attention(), 5);
    }
}
