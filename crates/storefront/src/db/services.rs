//! Service listing repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use vivero_core::{Price, ServiceId};

use super::RepositoryError;
use crate::models::{Service, ServiceInput};

const SERVICE_COLUMNS: &str =
    "id, name, description, price_from, image_url, position, active, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: i32,
    name: String,
    description: String,
    price_from: Option<Decimal>,
    image_url: Option<String>,
    position: i32,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Self {
            id: ServiceId::new(row.id),
            name: row.name,
            description: row.description,
            price_from: row.price_from.map(Price::ars),
            image_url: row.image_url,
            position: row.position,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct ServiceRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ServiceRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Service>, RepositoryError> {
        let rows: Vec<ServiceRow> = sqlx::query_as(&format!(
            "SELECT {SERVICE_COLUMNS} FROM store.services WHERE active ORDER BY position, name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Service::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Service>, RepositoryError> {
        let rows: Vec<ServiceRow> = sqlx::query_as(&format!(
            "SELECT {SERVICE_COLUMNS} FROM store.services ORDER BY position, name"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Service::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ServiceId) -> Result<Option<Service>, RepositoryError> {
        let row: Option<ServiceRow> = sqlx::query_as(&format!(
            "SELECT {SERVICE_COLUMNS} FROM store.services WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Service::from))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, input: &ServiceInput) -> Result<Service, RepositoryError> {
        let row: ServiceRow = sqlx::query_as(&format!(
            "INSERT INTO store.services (name, description, price_from, image_url, position, active)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {SERVICE_COLUMNS}"
        ))
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_from)
        .bind(input.image_url.as_deref())
        .bind(input.position)
        .bind(input.active)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn update(
        &self,
        id: ServiceId,
        input: &ServiceInput,
    ) -> Result<Service, RepositoryError> {
        let row: Option<ServiceRow> = sqlx::query_as(&format!(
            "UPDATE store.services
             SET name = $2, description = $3, price_from = $4, image_url = $5,
                 position = $6, active = $7
             WHERE id = $1
             RETURNING {SERVICE_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_from)
        .bind(input.image_url.as_deref())
        .bind(input.position)
        .bind(input.active)
        .fetch_optional(self.pool)
        .await?;

        row.map(Service::from).ok_or(RepositoryError::NotFound)
    }

    /// Insert a service unless one with the same name exists. Used by seeding.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_by_name(&self, input: &ServiceInput) -> Result<Service, RepositoryError> {
        let existing: Option<i32> =
            sqlx::query_scalar("SELECT id FROM store.services WHERE name = $1 LIMIT 1")
                .bind(&input.name)
                .fetch_optional(self.pool)
                .await?;

        match existing {
            Some(id) => self.update(ServiceId::new(id), input).await,
            None => self.create(input).await,
        }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn delete(&self, id: ServiceId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.services WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
