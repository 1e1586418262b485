//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL, used for gateway back URLs and email links
//! - `STOREFRONT_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `MERCADOPAGO_ACCESS_TOKEN` - Payment gateway access token
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM` - Outgoing mail
//! - `STORE_NOTIFICATION_EMAIL` - Where new-order notifications go
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `MERCADOPAGO_WEBHOOK_SECRET` - Enables `x-signature` verification on the webhook
//! - `RECAPTCHA_SECRET` / `RECAPTCHA_SITE_KEY` - Enables CAPTCHA on login and registration
//! - `BANK_TRANSFER_ALIAS`, `BANK_TRANSFER_CBU`, `BANK_TRANSFER_HOLDER` - Shown to
//!   customers who pay by transfer
//! - `STORE_SHIPPING_COST` - Flat shipping cost in pesos (default: 0)
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! The helper functions at the bottom are public so the admin binary loads
//! its own variables with the same validation.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Substrings that mark a secret as a copy-pasted placeholder (case-insensitive).
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    pub host: IpAddr,
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    pub session_secret: SecretString,
    pub mercadopago: MercadoPagoConfig,
    pub email: EmailConfig,
    /// CAPTCHA is skipped entirely when absent
    pub recaptcha: Option<RecaptchaConfig>,
    pub bank_transfer: BankTransferConfig,
    /// Recipient of new-order notifications
    pub store_notification_email: String,
    /// Flat cost added to orders with home delivery
    pub shipping_cost: Decimal,
    pub sentry: SentryConfig,
}

/// Payment gateway credentials.
#[derive(Clone)]
pub struct MercadoPagoConfig {
    pub access_token: SecretString,
    /// Shared secret for webhook `x-signature` checks
    pub webhook_secret: Option<SecretString>,
    /// API root, overridable for sandboxes
    pub api_base: String,
}

impl std::fmt::Debug for MercadoPagoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MercadoPagoConfig")
            .field("access_token", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Email (SMTP) configuration, shared with the admin binary.
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: SecretString,
    /// Sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Google reCAPTCHA keys.
#[derive(Clone)]
pub struct RecaptchaConfig {
    /// Public key rendered into the login and registration forms
    pub site_key: String,
    pub secret: SecretString,
}

impl std::fmt::Debug for RecaptchaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecaptchaConfig")
            .field("site_key", &self.site_key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Account details shown to customers paying by bank transfer.
#[derive(Debug, Clone, Default)]
pub struct BankTransferConfig {
    pub alias: Option<String>,
    pub cbu: Option<String>,
    pub holder: Option<String>,
}

impl BankTransferConfig {
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.alias.is_some() || self.cbu.is_some()
    }
}

/// Error tracking settings, shared with the admin binary.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    /// e.g. "development", "production"
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.1,
        }
    }
}

impl StorefrontConfig {
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

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?
            .trim_end_matches('/')
            .to_owned();
        let session_secret = get_validated_secret("STOREFRONT_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let shipping_cost = get_env_or_default("STORE_SHIPPING_COST", "0")
            .parse::<Decimal>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STORE_SHIPPING_COST".to_string(), e.to_string())
            })?;
        if shipping_cost.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "STORE_SHIPPING_COST".to_string(),
                "must not be negative".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            mercadopago: MercadoPagoConfig::from_env()?,
            email: EmailConfig::from_env()?,
            recaptcha: RecaptchaConfig::from_env()?,
            bank_transfer: BankTransferConfig::from_env(),
            store_notification_email: get_required_env("STORE_NOTIFICATION_EMAIL")?,
            shipping_cost,
            sentry: SentryConfig::from_env(),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Absolute URL for a path on this site.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl MercadoPagoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let webhook_secret = match get_optional_env("MERCADOPAGO_WEBHOOK_SECRET") {
            Some(secret) => {
                validate_secret_strength(&secret, "MERCADOPAGO_WEBHOOK_SECRET")?;
                Some(SecretString::from(secret))
            }
            None => {
                tracing::warn!("MERCADOPAGO_WEBHOOK_SECRET not set; webhook signatures are not checked");
                None
            }
        };

        Ok(Self {
            access_token: get_validated_secret("MERCADOPAGO_ACCESS_TOKEN")?,
            webhook_secret,
            api_base: get_env_or_default("MERCADOPAGO_API_BASE", "https://api.mercadopago.com"),
        })
    }
}

impl EmailConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if a required SMTP variable is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_validated_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
        })
    }
}

impl RecaptchaConfig {
    /// Both keys or neither.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        match (
            get_optional_env("RECAPTCHA_SITE_KEY"),
            get_optional_env("RECAPTCHA_SECRET"),
        ) {
            (Some(site_key), Some(secret)) => Ok(Some(Self {
                site_key,
                secret: SecretString::from(secret),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "RECAPTCHA_*".to_string(),
                "RECAPTCHA_SITE_KEY and RECAPTCHA_SECRET must be set together".to_string(),
            )),
        }
    }
}

impl BankTransferConfig {
    fn from_env() -> Self {
        Self {
            alias: get_optional_env("BANK_TRANSFER_ALIAS"),
            cbu: get_optional_env("BANK_TRANSFER_CBU"),
            holder: get_optional_env("BANK_TRANSFER_HOLDER"),
        }
    }
}

impl SentryConfig {
    /// Read `SENTRY_*`; unparsable rates fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: get_optional_env("SENTRY_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.sample_rate),
            traces_sample_rate: get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.traces_sample_rate),
        }
    }
}

// =============================================================================
// Environment helpers
// =============================================================================

/// Read a variable that must be present.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` when unset.
pub fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Read an app-specific database URL, falling back to the `DATABASE_URL`
/// that `fly postgres attach` sets.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` naming `primary_key` when neither is set.
pub fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Read a variable, treating empty values as unset.
#[must_use]
pub fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[must_use]
pub fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Reject session secrets shorter than 32 characters.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` when too short.
pub fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let len = secret.expose_secret().len();
    if len < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_SESSION_SECRET_LENGTH} characters (got {len})"),
        ));
    }
    Ok(())
}

/// Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholders and low-entropy values.
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` describing the failed check.
pub fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Read a required secret and check its strength.
///
/// # Errors
///
/// Returns `ConfigError` when missing or weak.
pub fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_edges() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        for value in ["your-api-key-here", "changeme123", "TEST-APP-TOKEN-PLACEHOLDER"] {
            let err = validate_secret_strength(value, "TEST_VAR").unwrap_err();
            assert!(matches!(err, ConfigError::InsecureSecret(_, _)), "{value}");
        }
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "S").is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mp = MercadoPagoConfig {
            access_token: SecretString::from("APP_USR-live-token-value"),
            webhook_secret: Some(SecretString::from("whsec-value-123")),
            api_base: "https://api.mercadopago.com".to_string(),
        };
        let email = EmailConfig {
            smtp_host: "smtp.vivero.test".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("smtp-pass-value"),
            from_address: "Vivero <hola@vivero.test>".to_string(),
        };

        let output = format!("{mp:?} {email:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(output.contains("smtp.vivero.test"));
        assert!(!output.contains("APP_USR-live-token-value"));
        assert!(!output.contains("whsec-value-123"));
        assert!(!output.contains("smtp-pass-value"));
    }

    #[test]
    fn test_bank_transfer_configured() {
        assert!(!BankTransferConfig::default().is_configured());
        let config = BankTransferConfig {
            alias: Some("vivero.plantas".to_string()),
            ..BankTransferConfig::default()
        };
        assert!(config.is_configured());
    }
}
