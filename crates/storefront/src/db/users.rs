//! User repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use vivero_core::{Email, UserId, UserRole};

use super::RepositoryError;
use crate::models::{Page, ProfileUpdate, User, UserFilter, limit_offset};

const USER_COLUMNS: &str = "id, email, name, phone, role, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    email: String,
    name: String,
    phone: Option<String>,
    role: UserRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            name: row.name,
            phone: row.phone,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM store.users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM store.users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Create a customer account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_with_password(
        &self,
        email: &Email,
        name: &str,
        phone: Option<&str>,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO store.users (email, name, phone, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(name)
        .bind(phone)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_or(e, "email already exists"))?;

        row.try_into()
    }

    /// Get the password hash for a user by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(&self, email: &Email) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar("SELECT password_hash FROM store.users WHERE email = $1")
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        Ok(hash)
    }

    /// Password hash by user id, for password changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash_by_id(
        &self,
        id: UserId,
    ) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar("SELECT password_hash FROM store.users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(hash)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE store.users SET name = $2, phone = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&update.name)
        .bind(update.phone.as_deref())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE store.users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Admin list, newest accounts first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &UserFilter,
        per_page: u32,
    ) -> Result<Page<User>, RepositoryError> {
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{s}%"));
        let (limit, offset) = limit_offset(filter.page, per_page);

        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM store.users
             WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)
               AND ($2::store.user_role IS NULL OR role = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(pattern.as_deref())
        .bind(filter.role)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM store.users
             WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)
               AND ($2::store.user_role IS NULL OR role = $2)",
        )
        .bind(pattern.as_deref())
        .bind(filter.role)
        .fetch_one(self.pool)
        .await?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(User::try_from)
                .collect::<Result<_, _>>()?,
            page: filter.page.max(1),
            per_page,
            total,
        })
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_role(&self, id: UserId, role: UserRole) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE store.users SET role = $2 WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// Set a role by email (CLI promotion).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no user has that email.
    pub async fn set_role_by_email(
        &self,
        email: &Email,
        role: UserRole,
    ) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE store.users SET role = $2 WHERE email = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(role)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete an account. Carts and addresses go with it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user has orders and
    /// `RepositoryError::NotFound` if the user does not exist.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::foreign_key_or(e, "user has orders"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM store.users")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
