//! Orders against a real database: stock reservation, payment updates and
//! cancellation.
//!
//! These tests require a `PostgreSQL` database migrated with
//! `vivero-cli migrate`. Each run creates its own user and products.
//!
//! Run with: cargo test -p vivero-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use sqlx::PgPool;

use vivero_core::{DeliveryMethod, Email, OrderStatus, PaymentMethod, ProductState};
use vivero_integration_tests::{database_pool, unique_email, unique_slug};
use vivero_storefront::db::{CartRepository, OrderRepository, ProductRepository, UserRepository};
use vivero_storefront::models::{CartItem, NewOrder, Product, ProductInput, User};
use vivero_storefront::services::PaymentStatus;

async fn customer(pool: &PgPool) -> User {
    let email = Email::parse(&unique_email()).unwrap();
    UserRepository::new(pool)
        .create_with_password(&email, "Lucía Fernández", None, "not-a-real-hash")
        .await
        .unwrap()
}

async fn product(pool: &PgPool, name: &str, stock: i32) -> Product {
    ProductRepository::new(pool)
        .create(&ProductInput {
            slug: unique_slug("test-ficus"),
            name: name.to_owned(),
            description: "Planta de interior".to_owned(),
            category: "interior".to_owned(),
            price: Decimal::new(12_500, 0),
            stock,
            state: ProductState::Active,
            image_url: None,
            featured: false,
        })
        .await
        .unwrap()
}

fn gateway_order(user: &User, items: &[CartItem]) -> NewOrder {
    let subtotal: Decimal = items.iter().map(|item| item.total().amount).sum();
    NewOrder {
        user_id: user.id,
        payment_method: PaymentMethod::MercadoPago,
        delivery_method: DeliveryMethod::Pickup,
        shipping_address: None,
        contact_phone: None,
        notes: None,
        subtotal,
        shipping_cost: Decimal::ZERO,
        total: subtotal,
    }
}

async fn reload(pool: &PgPool, product: &Product) -> Product {
    ProductRepository::new(pool)
        .get(product.id)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_order_reserves_stock_and_cancel_restores_it() {
    let pool = database_pool().await;
    let user = customer(&pool).await;
    let ficus = product(&pool, "Ficus lyrata", 3).await;

    let carts = CartRepository::new(&pool);
    carts.add(user.id, ficus.id, 3).await.unwrap();
    let items = carts.items_for_user(user.id).await.unwrap();

    let orders = OrderRepository::new(&pool);
    let order = orders
        .create_from_lines(&gateway_order(&user, &items), &items)
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::PendingPayment);
    assert_eq!(order.total.amount, Decimal::new(37_500, 0));

    let after_order = reload(&pool, &ficus).await;
    assert_eq!(after_order.stock, 0);
    assert_eq!(after_order.state, ProductState::Sold);
    assert_eq!(carts.count(user.id).await.unwrap(), 0);

    let saved_items = orders.items(order.id).await.unwrap();
    assert_eq!(saved_items.len(), 1);
    assert_eq!(saved_items[0].quantity, 3);

    let approved = PaymentStatus::parse("approved");
    let change = orders
        .apply_payment(order.id, "998877", approved.as_str(), approved.order_status())
        .await
        .unwrap();
    assert!(change.changed());
    assert_eq!(change.order.status, OrderStatus::Confirmed);

    let cancelled = orders.cancel(order.id).await.unwrap();
    assert_eq!(cancelled.previous, OrderStatus::Confirmed);
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);

    let after_cancel = reload(&pool, &ficus).await;
    assert_eq!(after_cancel.stock, 3);
    assert_eq!(after_cancel.state, ProductState::Active);
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_out_of_order_payment_keeps_status() {
    let pool = database_pool().await;
    let user = customer(&pool).await;
    let ficus = product(&pool, "Ficus elastica", 5).await;

    let carts = CartRepository::new(&pool);
    carts.add(user.id, ficus.id, 1).await.unwrap();
    let items = carts.items_for_user(user.id).await.unwrap();

    let orders = OrderRepository::new(&pool);
    let order = orders
        .create_from_lines(&gateway_order(&user, &items), &items)
        .await
        .unwrap();

    let approved = PaymentStatus::parse("approved");
    orders
        .apply_payment(order.id, "1001", approved.as_str(), approved.order_status())
        .await
        .unwrap();

    // A late "pending" notification must not move a confirmed order back.
    let pending = PaymentStatus::parse("pending");
    let change = orders
        .apply_payment(order.id, "1001", pending.as_str(), pending.order_status())
        .await
        .unwrap();
    assert!(!change.changed());
    assert_eq!(change.order.status, OrderStatus::Confirmed);
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_oversell_writes_nothing() {
    let pool = database_pool().await;
    let user = customer(&pool).await;
    let ficus = product(&pool, "Ficus benjamina", 2).await;

    let carts = CartRepository::new(&pool);
    carts.add(user.id, ficus.id, 3).await.unwrap();
    let items = carts.items_for_user(user.id).await.unwrap();

    let orders = OrderRepository::new(&pool);
    let err = orders
        .create_from_lines(&gateway_order(&user, &items), &items)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not enough stock for Ficus benjamina"));

    let unchanged = reload(&pool, &ficus).await;
    assert_eq!(unchanged.stock, 2);
    assert_eq!(unchanged.state, ProductState::Active);
    assert!(orders.list_for_user(user.id, 10).await.unwrap().is_empty());
    assert_eq!(carts.count(user.id).await.unwrap(), 3);
}
