//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_BASE_URL` - Public URL for the admin panel
//! - `ADMIN_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `STOREFRONT_BASE_URL` - Storefront URL, used for links in customer emails
//! - `STORE_NOTIFICATION_EMAIL` - Store inbox
//! - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET`
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM`
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `CLOUDINARY_FOLDER` - Upload folder (default: vivero)
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (TLS)
//! - `ADMIN_TLS_CERT` - PEM-encoded certificate chain
//! - `ADMIN_TLS_KEY` - PEM-encoded private key

use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;

pub use vivero_storefront::config::ConfigError;
use vivero_storefront::config::{
    EmailConfig, SentryConfig, get_database_url, get_env_or_default, get_optional_env,
    get_required_env, get_validated_secret, validate_session_secret,
};

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    pub session_secret: SecretString,
    pub storefront_url: String,
    pub store_notification_email: String,
    pub cloudinary: CloudinaryConfig,
    pub email: EmailConfig,
    pub sentry: SentryConfig,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Image CDN credentials.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
    pub folder: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.folder)
            .finish()
    }
}

impl CloudinaryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cloud_name: get_required_env("CLOUDINARY_CLOUD_NAME")?,
            api_key: get_required_env("CLOUDINARY_API_KEY")?,
            api_secret: SecretString::from(get_required_env("CLOUDINARY_API_SECRET")?),
            folder: get_env_or_default("CLOUDINARY_FOLDER", "vivero"),
        })
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        Self::from_parts(
            get_optional_env("ADMIN_TLS_CERT"),
            get_optional_env("ADMIN_TLS_KEY"),
        )
    }

    fn from_parts(cert: Option<String>, key: Option<String>) -> Result<Option<Self>, ConfigError> {
        match (cert, key) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "ADMIN_TLS_*".to_string(),
                "Both ADMIN_TLS_CERT and ADMIN_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ADMIN_DATABASE_URL")?;
        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;
        let base_url = get_required_env("ADMIN_BASE_URL")?
            .trim_end_matches('/')
            .to_owned();
        let session_secret = get_validated_secret("ADMIN_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "ADMIN_SESSION_SECRET")?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            storefront_url: get_required_env("STOREFRONT_BASE_URL")?
                .trim_end_matches('/')
                .to_owned(),
            store_notification_email: get_required_env("STORE_NOTIFICATION_EMAIL")?,
            cloudinary: CloudinaryConfig::from_env()?,
            email: EmailConfig::from_env()?,
            sentry: SentryConfig::from_env(),
            tls: TlsConfig::from_env()?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_requires_both_parts() {
        assert!(TlsConfig::from_parts(None, None).unwrap().is_none());
        assert!(
            TlsConfig::from_parts(Some("cert".into()), Some("key".into()))
                .unwrap()
                .is_some()
        );
        assert!(TlsConfig::from_parts(Some("cert".into()), None).is_err());
        assert!(TlsConfig::from_parts(None, Some("key".into())).is_err());
    }

    #[test]
    fn test_cloudinary_debug_redacts_secret() {
        let config = CloudinaryConfig {
            cloud_name: "vivero".to_owned(),
            api_key: "1234".to_owned(),
            api_secret: SecretString::from("super-secret-value"),
            folder: "vivero".to_owned(),
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret-value"));
    }
}
