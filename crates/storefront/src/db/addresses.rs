//! Address repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use vivero_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::{Address, AddressInput};

const ADDRESS_COLUMNS: &str = "id, user_id, label, street, city, province, postal_code, notes, \
                               is_default, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct AddressRow {
    id: i32,
    user_id: i32,
    label: String,
    street: String,
    city: String,
    province: String,
    postal_code: String,
    notes: Option<String>,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: AddressId::new(row.id),
            user_id: UserId::new(row.user_id),
            label: row.label,
            street: row.street,
            city: row.city,
            province: row.province,
            postal_code: row.postal_code,
            notes: row.notes,
            is_default: row.is_default,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for saved addresses. Every query is scoped to the owning user.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Default address first, then newest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows: Vec<AddressRow> = sqlx::query_as(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM store.addresses
             WHERE user_id = $1
             ORDER BY is_default DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Address::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row: Option<AddressRow> = sqlx::query_as(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM store.addresses WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Address::from))
    }

    /// Insert an address. The user's first address becomes the default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM store.addresses WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
        let is_default = input.is_default || existing == 0;

        if is_default {
            clear_default(&mut tx, user_id).await?;
        }

        let row: AddressRow = sqlx::query_as(&format!(
            "INSERT INTO store.addresses
                 (user_id, label, street, city, province, postal_code, notes, is_default)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&input.label)
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.province)
        .bind(&input.postal_code)
        .bind(input.notes.as_deref())
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if input.is_default {
            clear_default(&mut tx, user_id).await?;
        }

        let row: Option<AddressRow> = sqlx::query_as(&format!(
            "UPDATE store.addresses
             SET label = $3, street = $4, city = $5, province = $6, postal_code = $7,
                 notes = $8, is_default = is_default OR $9
             WHERE id = $1 AND user_id = $2
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(&input.label)
        .bind(&input.street)
        .bind(&input.city)
        .bind(&input.province)
        .bind(&input.postal_code)
        .bind(input.notes.as_deref())
        .bind(input.is_default)
        .fetch_optional(&mut *tx)
        .await?;

        let row = row.ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;
        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    pub async fn delete(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.addresses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Make one address the default, unsetting the previous one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address is not the user's.
    pub async fn set_default(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        clear_default(&mut tx, user_id).await?;

        let result = sqlx::query(
            "UPDATE store.addresses SET is_default = true WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn clear_default(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: UserId,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE store.addresses SET is_default = false WHERE user_id = $1 AND is_default")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
