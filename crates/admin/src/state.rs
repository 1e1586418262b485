//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use vivero_storefront::services::EmailService;

use crate::config::AdminConfig;
use crate::services::{CloudinaryClient, UploadError};

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("email transport: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
    #[error("image CDN client: {0}")]
    Cdn(#[from] UploadError),
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    email: EmailService,
    cdn: CloudinaryClient,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if a client cannot be configured.
    pub fn new(config: AdminConfig, pool: PgPool) -> Result<Self, StateError> {
        // Customer emails link to the storefront, not to the admin panel.
        let email = EmailService::new(
            &config.email,
            &config.storefront_url,
            &config.store_notification_email,
        )?;
        let cdn = CloudinaryClient::new(&config.cloudinary)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                cdn,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    #[must_use]
    pub fn cdn(&self) -> &CloudinaryClient {
        &self.inner.cdn
    }
}
