//! Cloudinary image uploads for products, slides and services.
//!
//! Uploads are signed: the parameters except `file`, `api_key` and
//! `signature_algorithm` are sorted, joined as `k=v&k=v`, suffixed with the
//! API secret and hashed with SHA-256.
//!
//! # API Reference
//!
//! - Endpoint: `POST https://api.cloudinary.com/v1_1/<cloud>/image/upload`
//! - Response: JSON with `secure_url`

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::CloudinaryConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("image is larger than 5 MB")]
    TooLarge,

    #[error("empty file")]
    Empty,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl UploadError {
    /// Problems with the file itself, as opposed to CDN failures.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(self, Self::UnsupportedType(_) | Self::TooLarge | Self::Empty)
    }

    /// Short code carried in `?error=` redirects.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedType(_) => "image_type",
            Self::TooLarge => "image_size",
            Self::Empty => "image_empty",
            Self::Http(_) | Self::Api { .. } | Self::Parse(_) => "upload_failed",
        }
    }
}

/// An image received from an admin form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Check type and size before anything is sent.
    ///
    /// # Errors
    ///
    /// Returns `Empty`, `TooLarge` or `UnsupportedType`.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge);
        }
        if !ALLOWED_CONTENT_TYPES.contains(&self.content_type.as_str()) {
            return Err(UploadError::UnsupportedType(self.content_type.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Sign upload parameters.
#[must_use]
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha256::digest(format!("{joined}{api_secret}").as_bytes()))
}

/// Cloudinary upload client.
#[derive(Clone)]
pub struct CloudinaryClient {
    inner: Arc<CloudinaryClientInner>,
}

struct CloudinaryClientInner {
    client: reqwest::Client,
    upload_url: String,
    api_key: String,
    api_secret: SecretString,
    folder: String,
}

impl CloudinaryClient {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            inner: Arc::new(CloudinaryClientInner {
                client,
                upload_url: format!("{API_BASE}/{}/image/upload", config.cloud_name),
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
                folder: config.folder.clone(),
            }),
        })
    }

    /// Upload an image and return its HTTPS URL.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a bad file, otherwise any API error.
    #[tracing::instrument(skip(self, image), fields(file_name = %image.file_name, size = image.bytes.len()))]
    pub async fn upload(&self, image: ImageUpload) -> Result<String, UploadError> {
        image.validate()?;

        let inner = &self.inner;
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", inner.folder.as_str()), ("timestamp", timestamp.as_str())],
            inner.api_secret.expose_secret(),
        );

        let file = Part::bytes(image.bytes)
            .file_name(image.file_name)
            .mime_str(&image.content_type)?;
        let form = Form::new()
            .part("file", file)
            .text("api_key", inner.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", inner.folder.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let response = inner
            .client
            .post(&inner.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Parse(e.to_string()))?;
        tracing::info!(url = %body.secure_url, "Image uploaded");
        Ok(body.secure_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(content_type: &str, len: usize) -> ImageUpload {
        ImageUpload {
            file_name: "ficus.jpg".to_owned(),
            content_type: content_type.to_owned(),
            bytes: vec![0; len],
        }
    }

    #[test]
    fn test_validate_accepts_supported_images() {
        for ct in ALLOWED_CONTENT_TYPES {
            assert!(image(ct, 1024).validate().is_ok());
        }
    }

    #[test]
    fn test_validate_rejects_bad_files() {
        assert!(matches!(
            image("image/gif", 10).validate(),
            Err(UploadError::UnsupportedType(_))
        ));
        assert!(matches!(
            image("image/png", MAX_UPLOAD_BYTES + 1).validate(),
            Err(UploadError::TooLarge)
        ));
        assert!(matches!(
            image("image/png", 0).validate(),
            Err(UploadError::Empty)
        ));
        assert!(image("image/png", MAX_UPLOAD_BYTES).validate().is_ok());
    }

    #[test]
    fn test_sign_params_sorts_and_appends_secret() {
        let secret = "abcd";
        let signed = sign_params(&[("timestamp", "1315060510"), ("folder", "vivero")], secret);
        let expected = hex::encode(Sha256::digest(
            b"folder=vivero&timestamp=1315060510abcd",
        ));
        assert_eq!(signed, expected);
        assert_eq!(signed.len(), 64);
    }

    #[test]
    fn test_sign_params_skips_empty_values() {
        assert_eq!(
            sign_params(&[("folder", ""), ("timestamp", "1")], "s"),
            sign_params(&[("timestamp", "1")], "s")
        );
    }
}
