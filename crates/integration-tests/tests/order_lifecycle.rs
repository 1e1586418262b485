//! Order status rules as both apps apply them.
//!
//! Customers cancel through the storefront, staff move orders forward from
//! the admin panel, and the payment webhook maps gateway statuses onto the
//! same state machine.

#![allow(clippy::unwrap_used)]

use vivero_core::{OrderStatus, PaymentMethod};
use vivero_storefront::services::PaymentStatus;

fn walk(start: OrderStatus, steps: &[OrderStatus]) -> OrderStatus {
    steps.iter().fold(start, |current, &next| {
        assert!(
            current.can_transition_to(next),
            "{current} -> {next} should be allowed"
        );
        next
    })
}

// =============================================================================
// Happy paths per payment method
// =============================================================================

#[test]
fn test_cash_order_to_delivery() {
    let start = PaymentMethod::Cash.initial_order_status();
    assert_eq!(start, OrderStatus::Pending);

    let end = walk(
        start,
        &[
            OrderStatus::Confirmed,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ],
    );
    assert!(end.is_terminal());
    assert!(end.next_statuses().is_empty());
}

#[test]
fn test_bank_transfer_waits_for_staff() {
    let start = PaymentMethod::BankTransfer.initial_order_status();
    assert_eq!(start, OrderStatus::PendingConfirmation);
    assert!(!PaymentMethod::BankTransfer.uses_gateway());

    assert_eq!(
        start.next_statuses(),
        vec![OrderStatus::Confirmed, OrderStatus::Cancelled]
    );
}

#[test]
fn test_gateway_payment_confirms_order() {
    let start = PaymentMethod::MercadoPago.initial_order_status();
    assert_eq!(start, OrderStatus::PendingPayment);
    assert!(PaymentMethod::MercadoPago.uses_gateway());

    let approved = PaymentStatus::parse("approved").order_status().unwrap();
    assert!(start.can_transition_to(approved));
    assert!(approved.counts_as_revenue());
}

#[test]
fn test_rejected_payment_leaves_order_alone() {
    for raw in ["rejected", "refunded", "charged_back", "cancelled", "mystery"] {
        assert_eq!(PaymentStatus::parse(raw).order_status(), None, "{raw}");
    }
    assert_eq!(
        PaymentStatus::parse("in_process").order_status(),
        Some(OrderStatus::PendingPayment)
    );
}

// =============================================================================
// Cancellation
// =============================================================================

#[test]
fn test_customer_cancels_only_before_confirmation() {
    for status in [
        OrderStatus::Pending,
        OrderStatus::PendingPayment,
        OrderStatus::PendingConfirmation,
    ] {
        assert!(status.is_cancellable_by_customer(), "{status}");
        assert!(status.can_transition_to(OrderStatus::Cancelled));
    }
    assert!(!OrderStatus::Confirmed.is_cancellable_by_customer());
}

#[test]
fn test_staff_cannot_cancel_shipped_orders() {
    assert!(OrderStatus::Confirmed.can_transition_to(OrderStatus::Cancelled));
    assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
    assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
}

#[test]
fn test_no_way_back() {
    assert!(!OrderStatus::Confirmed.can_transition_to(OrderStatus::Pending));
    assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Confirmed));
    assert!(OrderStatus::Cancelled.next_statuses().is_empty());
    assert!(!OrderStatus::Cancelled.counts_as_revenue());
}

#[test]
fn test_status_round_trips_through_forms() {
    for status in OrderStatus::ALL {
        assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), *status);
    }
    assert!("archived".parse::<OrderStatus>().is_err());
}
