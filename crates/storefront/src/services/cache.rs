//! In-memory cache for home-page slides and the services listing.
//!
//! Entries expire after 5 minutes, so admin edits show up on the storefront
//! within that window. Both are small, rarely-changing lists.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use crate::db::{RepositoryError, ServiceRepository, SlideRepository};
use crate::models::{Service, Slide};

const TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Slides,
    Services,
}

#[derive(Debug, Clone)]
enum CacheValue {
    Slides(Arc<Vec<Slide>>),
    Services(Arc<Vec<Service>>),
}

/// Cached catalog content.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().max_capacity(16).time_to_live(TTL).build(),
        }
    }

    /// Enabled slides in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` when the cache is cold and the query fails.
    pub async fn slides(&self, pool: &PgPool) -> Result<Arc<Vec<Slide>>, RepositoryError> {
        if let Some(CacheValue::Slides(slides)) = self.cache.get(&CacheKey::Slides).await {
            debug!("Cache hit for slides");
            return Ok(slides);
        }

        let slides = Arc::new(SlideRepository::new(pool).list_enabled().await?);
        self.cache
            .insert(CacheKey::Slides, CacheValue::Slides(Arc::clone(&slides)))
            .await;
        Ok(slides)
    }

    /// Active services in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` when the cache is cold and the query fails.
    pub async fn services(&self, pool: &PgPool) -> Result<Arc<Vec<Service>>, RepositoryError> {
        if let Some(CacheValue::Services(services)) = self.cache.get(&CacheKey::Services).await {
            debug!("Cache hit for services");
            return Ok(services);
        }

        let services = Arc::new(ServiceRepository::new(pool).list_active().await?);
        self.cache
            .insert(
                CacheKey::Services,
                CacheValue::Services(Arc::clone(&services)),
            )
            .await;
        Ok(services)
    }
}
