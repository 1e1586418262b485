//! Product repository.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use vivero_core::{Price, ProductId, ProductState};

use super::RepositoryError;
use crate::models::{Page, Product, ProductFilter, ProductInput, limit_offset};

const PRODUCT_COLUMNS: &str = "id, slug, name, description, category, price, stock, state, \
                               image_url, featured, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    slug: String,
    name: String,
    description: String,
    category: String,
    price: Decimal,
    stock: i32,
    state: ProductState,
    image_url: Option<String>,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            slug: row.slug,
            name: row.name,
            description: row.description,
            category: row.category,
            price: Price::ars(row.price),
            stock: row.stock,
            state: row.state,
            image_url: row.image_url,
            featured: row.featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Storefront catalog: every product that is not hidden, newest first.
    ///
    /// Sold-out products stay listed so their pages keep working.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(
        &self,
        filter: &ProductFilter,
        per_page: u32,
    ) -> Result<Page<Product>, RepositoryError> {
        let search = filter.search_pattern();
        let (limit, offset) = limit_offset(filter.page, per_page);

        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM store.products
             WHERE state <> 'inactive'
               AND ($1::text IS NULL OR category = $1)
               AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2)
             ORDER BY (state = 'active') DESC, created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(filter.category.as_deref())
        .bind(search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM store.products
             WHERE state <> 'inactive'
               AND ($1::text IS NULL OR category = $1)
               AND ($2::text IS NULL OR name ILIKE $2 OR description ILIKE $2)",
        )
        .bind(filter.category.as_deref())
        .bind(search.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(Page {
            items: rows.into_iter().map(Product::from).collect(),
            page: filter.page.max(1),
            per_page,
            total,
        })
    }

    /// Admin list: all products, optionally narrowed by state and search.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(
        &self,
        filter: &ProductFilter,
        per_page: u32,
    ) -> Result<Page<Product>, RepositoryError> {
        let search = filter.search_pattern();
        let (limit, offset) = limit_offset(filter.page, per_page);

        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM store.products
             WHERE ($1::store.product_state IS NULL OR state = $1)
               AND ($2::text IS NULL OR name ILIKE $2 OR slug ILIKE $2 OR category ILIKE $2)
             ORDER BY updated_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(filter.state)
        .bind(search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM store.products
             WHERE ($1::store.product_state IS NULL OR state = $1)
               AND ($2::text IS NULL OR name ILIKE $2 OR slug ILIKE $2 OR category ILIKE $2)",
        )
        .bind(filter.state)
        .bind(search.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok(Page {
            items: rows.into_iter().map(Product::from).collect(),
            page: filter.page.max(1),
            per_page,
            total,
        })
    }

    /// Featured products for the home page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM store.products
             WHERE featured AND state = 'active'
             ORDER BY updated_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM store.products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM store.products WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Distinct categories of listed products, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let categories = sqlx::query_scalar(
            "SELECT DISTINCT category FROM store.products
             WHERE state <> 'inactive'
             ORDER BY category",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Insert a product. The stored state follows the stock level.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let state = input.state.after_stock_change(input.stock);

        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO store.products
                 (slug, name, description, category, price, stock, state, image_url, featured)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.price)
        .bind(input.stock)
        .bind(state)
        .bind(input.image_url.as_deref())
        .bind(input.featured)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_or(e, "slug already exists"))?;

        Ok(row.into())
    }

    /// Replace every editable field. The stored state follows the stock level.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id and
    /// `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let state = input.state.after_stock_change(input.stock);

        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "UPDATE store.products
             SET slug = $2, name = $3, description = $4, category = $5, price = $6,
                 stock = $7, state = $8, image_url = $9, featured = $10
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.price)
        .bind(input.stock)
        .bind(state)
        .bind(input.image_url.as_deref())
        .bind(input.featured)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_or(e, "slug already exists"))?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    /// Insert or update by slug. Used by catalog seeding.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_by_slug(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let state = input.state.after_stock_change(input.stock);

        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO store.products
                 (slug, name, description, category, price, stock, state, image_url, featured)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (slug) DO UPDATE
             SET name = EXCLUDED.name, description = EXCLUDED.description,
                 category = EXCLUDED.category, price = EXCLUDED.price,
                 stock = EXCLUDED.stock, state = EXCLUDED.state,
                 image_url = EXCLUDED.image_url, featured = EXCLUDED.featured
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.category)
        .bind(input.price)
        .bind(input.stock)
        .bind(state)
        .bind(input.image_url.as_deref())
        .bind(input.featured)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Delete a product. Past order items keep their snapshot with no product link.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Number of products in each state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_state(&self) -> Result<BTreeMap<&'static str, i64>, RepositoryError> {
        let rows: Vec<(ProductState, i64)> = sqlx::query_as(
            "SELECT state, COUNT(*) FROM store.products GROUP BY state",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(state, count)| (state.as_str(), count))
            .collect())
    }

    /// Active products with at most `threshold` units left, lowest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self, threshold: i32) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM store.products
             WHERE state = 'active' AND stock <= $1
             ORDER BY stock, name
             LIMIT 20"
        ))
        .bind(threshold)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }
}
