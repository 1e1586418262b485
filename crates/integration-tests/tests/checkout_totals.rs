//! Cart pricing and the checks run before an order is placed.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use vivero_core::{
    CartItemId, CheckoutRuleError, MAX_LINE_QUANTITY, Price, ProductId, ProductState,
    order_subtotal, order_total, validate_quantity,
};
use vivero_storefront::models::CartItem;
use vivero_storefront::services::checkout::check_items;
use vivero_storefront::services::CheckoutError;

fn item(id: i32, price: i64, quantity: u32, stock: i32, state: ProductState) -> CartItem {
    CartItem {
        id: CartItemId::new(id),
        product_id: ProductId::new(id),
        slug: format!("planta-{id}"),
        name: format!("Planta {id}"),
        image_url: None,
        unit_price: Price::ars(Decimal::new(price, 0)),
        quantity,
        stock,
        state,
    }
}

#[test]
fn test_total_adds_shipping_to_every_line() {
    let items = [
        item(1, 18_500, 1, 10, ProductState::Active),
        item(2, 4_500, 3, 40, ProductState::Active),
    ];
    let lines = check_items(&items).unwrap();

    assert_eq!(order_subtotal(&lines).unwrap().amount, Decimal::new(32_000, 0));
    assert_eq!(
        order_total(&lines, Decimal::new(2_500, 0)).unwrap().amount,
        Decimal::new(34_500, 0)
    );
    // Pickup orders pass zero shipping.
    assert_eq!(
        order_total(&lines, Decimal::ZERO).unwrap().amount,
        Decimal::new(32_000, 0)
    );
}

#[test]
fn test_cents_are_kept_exact() {
    let mut cheap = item(1, 0, 3, 10, ProductState::Active);
    cheap.unit_price = Price::ars(Decimal::new(1_999, 2));
    let lines = check_items(&[cheap]).unwrap();
    assert_eq!(order_subtotal(&lines).unwrap().amount, Decimal::new(5_997, 2));
}

#[test]
fn test_sold_out_line_blocks_checkout() {
    let items = [
        item(1, 1_000, 1, 5, ProductState::Active),
        item(2, 1_000, 1, 0, ProductState::Sold),
    ];
    match check_items(&items) {
        Err(CheckoutError::Rule { name, source }) => {
            assert_eq!(name, "Planta 2");
            assert_eq!(source, CheckoutRuleError::Unavailable(ProductId::new(2)));
        }
        other => panic!("expected a rule error, got {other:?}"),
    }
}

#[test]
fn test_stock_dropped_after_adding_to_cart() {
    let items = [item(1, 1_000, 4, 2, ProductState::Active)];
    assert!(matches!(
        check_items(&items),
        Err(CheckoutError::Rule {
            source: CheckoutRuleError::InsufficientStock { available: 2 },
            ..
        })
    ));
}

#[test]
fn test_empty_cart_cannot_check_out() {
    assert!(matches!(check_items(&[]), Err(CheckoutError::EmptyCart)));
}

#[test]
fn test_quantity_limits() {
    assert_eq!(validate_quantity(0, 10), Err(CheckoutRuleError::ZeroQuantity));
    assert_eq!(
        validate_quantity(MAX_LINE_QUANTITY + 1, 1_000),
        Err(CheckoutRuleError::QuantityTooLarge {
            max: MAX_LINE_QUANTITY
        })
    );
    assert_eq!(
        validate_quantity(1, -3),
        Err(CheckoutRuleError::InsufficientStock { available: 0 })
    );
    assert_eq!(validate_quantity(MAX_LINE_QUANTITY, 1_000), Ok(()));
}
