//! Order repository.
//!
//! Stock moves only inside transactions here: placing an order decrements it
//! with a conditional update per line, and cancelling restores it together
//! with the status change.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};

use vivero_core::{
    DeliveryMethod, Email, OrderId, OrderItemId, OrderStatus, PaymentMethod, Price, ProductId,
    UserId,
};

use super::{RepositoryError, carts, to_u32};
use crate::models::{
    CartItem, NewOrder, Order, OrderFilter, OrderItem, OrderStats, OrderSummary, Page,
    limit_offset,
};

const ORDER_COLUMNS: &str = "o.id, o.user_id, o.status, o.payment_method, o.delivery_method, \
                             o.shipping_address, o.contact_phone, o.notes, o.subtotal, \
                             o.shipping_cost, o.total, o.payment_reference, o.payment_id, \
                             o.payment_status, o.created_at, o.updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    status: OrderStatus,
    payment_method: PaymentMethod,
    delivery_method: DeliveryMethod,
    shipping_address: Option<String>,
    contact_phone: Option<String>,
    notes: Option<String>,
    subtotal: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    payment_reference: Option<String>,
    payment_id: Option<String>,
    payment_status: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            status: row.status,
            payment_method: row.payment_method,
            delivery_method: row.delivery_method,
            shipping_address: row.shipping_address,
            contact_phone: row.contact_phone,
            notes: row.notes,
            subtotal: Price::ars(row.subtotal),
            shipping_cost: Price::ars(row.shipping_cost),
            total: Price::ars(row.total),
            payment_reference: row.payment_reference,
            payment_id: row.payment_id,
            payment_status: row.payment_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderSummaryRow {
    #[sqlx(flatten)]
    order: OrderRow,
    customer_name: String,
    customer_email: String,
    item_count: i64,
}

impl TryFrom<OrderSummaryRow> for OrderSummary {
    type Error = RepositoryError;

    fn try_from(row: OrderSummaryRow) -> Result<Self, Self::Error> {
        let customer_email = Email::parse(&row.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            order: row.order.into(),
            customer_name: row.customer_name,
            customer_email,
            item_count: row.item_count,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i32,
    order_id: i32,
    product_id: Option<i32>,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
    line_total: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: OrderItemId::new(row.id),
            order_id: OrderId::new(row.order_id),
            product_id: row.product_id.map(ProductId::new),
            product_name: row.product_name,
            unit_price: Price::ars(row.unit_price),
            quantity: to_u32(row.quantity, "order item quantity")?,
            line_total: Price::ars(row.line_total),
        })
    }
}

/// Result of a status change: the updated order and the status it left.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub order: Order,
    pub previous: OrderStatus,
}

impl StatusChange {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.order.status != self.previous
    }
}

/// Repository for orders and order items.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Turn validated cart lines into an order in one transaction.
    ///
    /// Each line decrements stock only if enough units remain and the product
    /// is still active; a product that reaches zero becomes `sold`. The cart
    /// is cleared on success. Nothing is written if any line fails.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` naming the first line whose stock
    /// could not be reserved.
    pub async fn create_from_lines(
        &self,
        order: &NewOrder,
        items: &[CartItem],
    ) -> Result<Order, RepositoryError> {
        if items.is_empty() {
            return Err(RepositoryError::Conflict("cart is empty".to_owned()));
        }

        let mut tx = self.pool.begin().await?;

        for item in items {
            let quantity = quantity_i32(item.quantity)?;
            let reserved: Option<i32> = sqlx::query_scalar(
                "UPDATE store.products
                 SET stock = stock - $2,
                     state = CASE WHEN stock - $2 = 0
                                  THEN 'sold'::store.product_state ELSE state END
                 WHERE id = $1 AND stock >= $2 AND state = 'active'
                 RETURNING id",
            )
            .bind(item.product_id)
            .bind(quantity)
            .fetch_optional(&mut *tx)
            .await?;

            if reserved.is_none() {
                return Err(RepositoryError::Conflict(format!(
                    "not enough stock for {}",
                    item.name
                )));
            }
        }

        let row: OrderRow = sqlx::query_as(&format!(
            "INSERT INTO store.orders AS o
                 (user_id, status, payment_method, delivery_method, shipping_address,
                  contact_phone, notes, subtotal, shipping_cost, total)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.user_id)
        .bind(order.initial_status())
        .bind(order.payment_method)
        .bind(order.delivery_method)
        .bind(order.shipping_address.as_deref())
        .bind(order.contact_phone.as_deref())
        .bind(order.notes.as_deref())
        .bind(order.subtotal)
        .bind(order.shipping_cost)
        .bind(order.total)
        .fetch_one(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO store.order_items
                     (order_id, product_id, product_name, unit_price, quantity, line_total)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.unit_price.amount)
            .bind(quantity_i32(item.quantity)?)
            .bind(item.total().amount)
            .execute(&mut *tx)
            .await?;
        }

        carts::clear_in(&mut tx, order.user_id).await?;
        tx.commit().await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM store.orders o WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// Order with customer details, for the admin detail page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_user(&self, id: OrderId) -> Result<Option<OrderSummary>, RepositoryError> {
        let row: Option<OrderSummaryRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS}, u.name AS customer_name, u.email AS customer_email,
                    (SELECT COUNT(*) FROM store.order_items i WHERE i.order_id = o.id) AS item_count
             FROM store.orders o
             JOIN store.users u ON u.id = o.user_id
             WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(OrderSummary::try_from).transpose()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT id, order_id, product_id, product_name, unit_price, quantity, line_total
             FROM store.order_items
             WHERE order_id = $1
             ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderItem::try_from).collect()
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM store.orders o
             WHERE o.user_id = $1
             ORDER BY o.created_at DESC, o.id DESC
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Admin list: orders joined with the customer who placed them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_with_users(
        &self,
        filter: &OrderFilter,
        per_page: u32,
    ) -> Result<Page<OrderSummary>, RepositoryError> {
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let pattern = search.map(|s| format!("%{s}%"));
        let order_number = search
            .and_then(|s| s.trim_start_matches('#').parse::<i32>().ok());
        let (limit, offset) = limit_offset(filter.page, per_page);

        let rows: Vec<OrderSummaryRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS}, u.name AS customer_name, u.email AS customer_email,
                    (SELECT COUNT(*) FROM store.order_items i WHERE i.order_id = o.id) AS item_count
             FROM store.orders o
             JOIN store.users u ON u.id = o.user_id
             WHERE ($1::store.order_status IS NULL OR o.status = $1)
               AND ($2::text IS NULL OR u.name ILIKE $2 OR u.email ILIKE $2 OR o.id = $3)
             ORDER BY o.created_at DESC, o.id DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(filter.status)
        .bind(pattern.as_deref())
        .bind(order_number)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)
             FROM store.orders o
             JOIN store.users u ON u.id = o.user_id
             WHERE ($1::store.order_status IS NULL OR o.status = $1)
               AND ($2::text IS NULL OR u.name ILIKE $2 OR u.email ILIKE $2 OR o.id = $3)",
        )
        .bind(filter.status)
        .bind(pattern.as_deref())
        .bind(order_number)
        .fetch_one(self.pool)
        .await?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(OrderSummary::try_from)
                .collect::<Result<_, _>>()?,
            page: filter.page.max(1),
            per_page,
            total,
        })
    }

    /// Move an order to `next` if the lifecycle allows it.
    ///
    /// Moving to `cancelled` restores stock in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown order and
    /// `RepositoryError::Conflict` for a transition the lifecycle forbids.
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<StatusChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let change = transition_in(&mut tx, id, next).await?;
        tx.commit().await?;
        Ok(change)
    }

    /// Cancel an order, putting its units back in stock.
    ///
    /// Products that had sold out become active again.
    ///
    /// # Errors
    ///
    /// Same as [`Self::update_status`].
    pub async fn cancel(&self, id: OrderId) -> Result<StatusChange, RepositoryError> {
        self.update_status(id, OrderStatus::Cancelled).await
    }

    /// Store the gateway preference id created for this order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown order.
    pub async fn set_payment_reference(
        &self,
        id: OrderId,
        reference: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE store.orders SET payment_reference = $2 WHERE id = $1")
            .bind(id)
            .bind(reference)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Record gateway payment details and, when given and allowed, a new status.
    ///
    /// The payment id and raw status are always stored. A status the lifecycle
    /// does not allow from the current one is ignored rather than rejected,
    /// since gateways resend notifications out of order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown order.
    pub async fn apply_payment(
        &self,
        id: OrderId,
        payment_id: &str,
        payment_status: &str,
        new_status: Option<OrderStatus>,
    ) -> Result<StatusChange, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let previous = lock_status(&mut tx, id).await?;

        let status = match new_status {
            Some(next) if previous.can_transition_to(next) => next,
            _ => previous,
        };

        let row: OrderRow = sqlx::query_as(&format!(
            "UPDATE store.orders AS o
             SET payment_id = $2, payment_status = $3, status = $4
             WHERE o.id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(payment_id)
        .bind(payment_status)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(StatusChange {
            order: row.into(),
            previous,
        })
    }

    /// Order counts per status and revenue from paid orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<OrderStats, RepositoryError> {
        let rows: Vec<(OrderStatus, i64, Decimal)> = sqlx::query_as(
            "SELECT status, COUNT(*), COALESCE(SUM(total), 0)
             FROM store.orders
             GROUP BY status",
        )
        .fetch_all(self.pool)
        .await?;

        let mut stats = OrderStats::default();
        for (status, count, total) in rows {
            stats.by_status.insert(status.as_str(), count);
            if status.counts_as_revenue() {
                stats.revenue += total;
            }
        }
        Ok(stats)
    }
}

fn quantity_i32(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity).map_err(|_| RepositoryError::Conflict("quantity out of range".to_owned()))
}

/// Lock the order row and return its current status.
async fn lock_status(
    tx: &mut Transaction<'_, Postgres>,
    id: OrderId,
) -> Result<OrderStatus, RepositoryError> {
    let status: Option<OrderStatus> =
        sqlx::query_scalar("SELECT status FROM store.orders WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

    status.ok_or(RepositoryError::NotFound)
}

async fn transition_in(
    tx: &mut Transaction<'_, Postgres>,
    id: OrderId,
    next: OrderStatus,
) -> Result<StatusChange, RepositoryError> {
    let previous = lock_status(tx, id).await?;

    if !previous.can_transition_to(next) {
        return Err(RepositoryError::Conflict(format!(
            "cannot change order from {previous} to {next}"
        )));
    }

    if next == OrderStatus::Cancelled {
        sqlx::query(
            "UPDATE store.products p
             SET stock = p.stock + i.quantity,
                 state = CASE WHEN p.state = 'sold'
                              THEN 'active'::store.product_state ELSE p.state END
             FROM (
                 SELECT product_id, SUM(quantity)::INTEGER AS quantity
                 FROM store.order_items
                 WHERE order_id = $1 AND product_id IS NOT NULL
                 GROUP BY product_id
             ) i
             WHERE p.id = i.product_id",
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;
    }

    let row: OrderRow = sqlx::query_as(&format!(
        "UPDATE store.orders AS o SET status = $2 WHERE o.id = $1 RETURNING {ORDER_COLUMNS}"
    ))
    .bind(id)
    .bind(next)
    .fetch_one(&mut **tx)
    .await?;

    Ok(StatusChange {
        order: row.into(),
        previous,
    })
}
