//! reCAPTCHA verification for login and registration.
//!
//! When no secret is configured every check passes, so local development
//! needs no Google keys.

use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::RecaptchaConfig;

const VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Form field the widget posts its token in.
pub const TOKEN_FIELD: &str = "g-recaptcha-response";

#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("captcha token missing")]
    MissingToken,

    #[error("captcha rejected: {0:?}")]
    Rejected(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Client for Google's `siteverify` endpoint.
#[derive(Clone)]
pub struct CaptchaVerifier {
    client: reqwest::Client,
    config: Option<RecaptchaConfig>,
}

impl CaptchaVerifier {
    #[must_use]
    pub fn new(client: reqwest::Client, config: Option<RecaptchaConfig>) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Public key for the form widget, when enabled.
    #[must_use]
    pub fn site_key(&self) -> Option<&str> {
        self.config.as_ref().map(|c| c.site_key.as_str())
    }

    /// Verify a widget token.
    ///
    /// # Errors
    ///
    /// Returns `CaptchaError::MissingToken` for an empty token,
    /// `CaptchaError::Rejected` when Google says no, and `CaptchaError::Http`
    /// when Google cannot be reached.
    #[tracing::instrument(skip(self, token))]
    pub async fn verify(&self, token: Option<&str>, remote_ip: Option<&str>) -> Result<(), CaptchaError> {
        let Some(config) = &self.config else {
            return Ok(());
        };
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(CaptchaError::MissingToken)?;

        let mut form = vec![
            ("secret", config.secret.expose_secret()),
            ("response", token),
        ];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip));
        }

        let response: VerifyResponse = self
            .client
            .post(VERIFY_URL)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.success {
            Ok(())
        } else {
            tracing::info!(codes = ?response.error_codes, "captcha rejected");
            Err(CaptchaError::Rejected(response.error_codes))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    #[tokio::test]
    async fn test_disabled_verifier_always_passes() {
        let verifier = CaptchaVerifier::new(reqwest::Client::new(), None);
        assert!(!verifier.is_enabled());
        assert!(verifier.verify(None, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_enabled_verifier_requires_token() {
        let verifier = CaptchaVerifier::new(
            reqwest::Client::new(),
            Some(RecaptchaConfig {
                site_key: "site-key".to_owned(),
                secret: SecretString::from("captcha-secret"),
            }),
        );
        assert_eq!(verifier.site_key(), Some("site-key"));
        assert!(matches!(
            verifier.verify(Some("  "), None).await,
            Err(CaptchaError::MissingToken)
        ));
    }

    #[test]
    fn test_parse_response() {
        let json = r#"{"success":false,"error-codes":["timeout-or-duplicate"]}"#;
        let parsed: VerifyResponse = serde_json::from_str(json).unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.error_codes, vec!["timeout-or-duplicate".to_owned()]);
    }
}
