//! Home-page slide repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use vivero_core::SlideId;

use super::RepositoryError;
use crate::models::{Slide, SlideInput};

const SLIDE_COLUMNS: &str =
    "id, title, subtitle, image_url, link_url, position, enabled, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct SlideRow {
    id: i32,
    title: String,
    subtitle: Option<String>,
    image_url: String,
    link_url: Option<String>,
    position: i32,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SlideRow> for Slide {
    fn from(row: SlideRow) -> Self {
        Self {
            id: SlideId::new(row.id),
            title: row.title,
            subtitle: row.subtitle,
            image_url: row.image_url,
            link_url: row.link_url,
            position: row.position,
            enabled: row.enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub struct SlideRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SlideRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Enabled slides in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_enabled(&self) -> Result<Vec<Slide>, RepositoryError> {
        let rows: Vec<SlideRow> = sqlx::query_as(&format!(
            "SELECT {SLIDE_COLUMNS} FROM store.hero_slides
             WHERE enabled
             ORDER BY position, id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Slide::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Slide>, RepositoryError> {
        let rows: Vec<SlideRow> = sqlx::query_as(&format!(
            "SELECT {SLIDE_COLUMNS} FROM store.hero_slides ORDER BY position, id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Slide::from).collect())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SlideId) -> Result<Option<Slide>, RepositoryError> {
        let row: Option<SlideRow> = sqlx::query_as(&format!(
            "SELECT {SLIDE_COLUMNS} FROM store.hero_slides WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Slide::from))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, input: &SlideInput) -> Result<Slide, RepositoryError> {
        let row: SlideRow = sqlx::query_as(&format!(
            "INSERT INTO store.hero_slides (title, subtitle, image_url, link_url, position, enabled)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {SLIDE_COLUMNS}"
        ))
        .bind(&input.title)
        .bind(input.subtitle.as_deref())
        .bind(&input.image_url)
        .bind(input.link_url.as_deref())
        .bind(input.position)
        .bind(input.enabled)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn update(&self, id: SlideId, input: &SlideInput) -> Result<Slide, RepositoryError> {
        let row: Option<SlideRow> = sqlx::query_as(&format!(
            "UPDATE store.hero_slides
             SET title = $2, subtitle = $3, image_url = $4, link_url = $5,
                 position = $6, enabled = $7
             WHERE id = $1
             RETURNING {SLIDE_COLUMNS}"
        ))
        .bind(id)
        .bind(&input.title)
        .bind(input.subtitle.as_deref())
        .bind(&input.image_url)
        .bind(input.link_url.as_deref())
        .bind(input.position)
        .bind(input.enabled)
        .fetch_optional(self.pool)
        .await?;

        row.map(Slide::from).ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn set_enabled(&self, id: SlideId, enabled: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE store.hero_slides SET enabled = $2 WHERE id = $1")
            .bind(id)
            .bind(enabled)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Insert a slide unless one with the same title exists. Used by seeding.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_by_title(&self, input: &SlideInput) -> Result<Slide, RepositoryError> {
        let existing: Option<i32> =
            sqlx::query_scalar("SELECT id FROM store.hero_slides WHERE title = $1 LIMIT 1")
                .bind(&input.title)
                .fetch_optional(self.pool)
                .await?;

        match existing {
            Some(id) => self.update(SlideId::new(id), input).await,
            None => self.create(input).await,
        }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for an unknown id.
    pub async fn delete(&self, id: SlideId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM store.hero_slides WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
