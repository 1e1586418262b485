//! Application state shared across handlers.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;

use vivero_core::Price;

use crate::config::StorefrontConfig;
use crate::services::{
    CaptchaVerifier, CatalogCache, EmailService, MercadoPagoClient, PaymentError,
};

/// Error building the shared clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment client: {0}")]
    Payments(#[from] PaymentError),
    #[error("email transport: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    payments: MercadoPagoClient,
    email: EmailService,
    captcha: CaptchaVerifier,
    cache: CatalogCache,
}

impl AppState {
    /// Build the state and the outbound clients. Nothing connects yet.
    ///
    /// # Errors
    ///
    /// Returns an error if a client cannot be configured.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let payments = MercadoPagoClient::new(&config.mercadopago, &config.base_url)?;
        let email = EmailService::new(
            &config.email,
            &config.base_url,
            &config.store_notification_email,
        )?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        let captcha = CaptchaVerifier::new(http, config.recaptcha.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                payments,
                email,
                captcha,
                cache: CatalogCache::new(),
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn payments(&self) -> &MercadoPagoClient {
        &self.inner.payments
    }

    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    #[must_use]
    pub fn captcha(&self) -> &CaptchaVerifier {
        &self.inner.captcha
    }

    #[must_use]
    pub fn cache(&self) -> &CatalogCache {
        &self.inner.cache
    }

    /// Flat shipping charge for home delivery.
    #[must_use]
    pub fn shipping_cost(&self) -> Price {
        Price::ars(self.inner.config.shipping_cost.max(Decimal::ZERO))
    }
}
