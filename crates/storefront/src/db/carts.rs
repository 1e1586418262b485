//! Cart repository.
//!
//! Carts store only product references and quantities. Price, stock and state
//! come from a join with `store.products` on every read.

use rust_decimal::Decimal;
use sqlx::PgPool;

use vivero_core::{CartItemId, Price, ProductId, ProductState, UserId};

use super::{RepositoryError, to_u32};
use crate::models::CartItem;

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: i32,
    product_id: i32,
    slug: String,
    name: String,
    image_url: Option<String>,
    price: Decimal,
    quantity: i32,
    stock: i32,
    state: ProductState,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CartItemId::new(row.id),
            product_id: ProductId::new(row.product_id),
            slug: row.slug,
            name: row.name,
            image_url: row.image_url,
            unit_price: Price::ars(row.price),
            quantity: to_u32(row.quantity, "cart quantity")?,
            stock: row.stock,
            state: row.state,
        })
    }
}

/// Repository for per-user carts.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Cart rows joined with live product data, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items_for_user(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows: Vec<CartItemRow> = sqlx::query_as(
            "SELECT c.id, c.product_id, p.slug, p.name, p.image_url, p.price,
                    c.quantity, p.stock, p.state
             FROM store.cart_items c
             JOIN store.products p ON p.id = c.product_id
             WHERE c.user_id = $1
             ORDER BY c.created_at, c.id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartItem::try_from).collect()
    }

    /// Quantity of one product already in the cart (zero when absent).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn quantity_of(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<u32, RepositoryError> {
        let quantity: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM store.cart_items WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        quantity.map_or(Ok(0), |q| to_u32(q, "cart quantity"))
    }

    /// Add units of a product, summing with any quantity already there.
    ///
    /// Callers check the summed quantity against stock first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let quantity = i32::try_from(quantity)
            .map_err(|_| RepositoryError::Conflict("quantity out of range".to_owned()))?;

        sqlx::query(
            "INSERT INTO store.cart_items (user_id, product_id, quantity)
             VALUES ($1, $2, $3)
             ON CONFLICT (user_id, product_id)
             DO UPDATE SET quantity = store.cart_items.quantity + EXCLUDED.quantity",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Replace the quantity of a line the user owns.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when the product is not in the cart.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let quantity = i32::try_from(quantity)
            .map_err(|_| RepositoryError::Conflict("quantity out of range".to_owned()))?;

        let result = sqlx::query(
            "UPDATE store.cart_items SET quantity = $3 WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM store.cart_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        clear_in(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Total units in the cart, for the header badge.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM store.cart_items WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}

/// Delete a user's cart rows inside an open transaction.
pub(crate) async fn clear_in(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: UserId,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM store.cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
