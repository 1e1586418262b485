//! Multipart form reading for the catalog editors.
//!
//! Product, slide and service forms carry an optional image file next to
//! plain text fields, so they are posted as `multipart/form-data`.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::{DefaultBodyLimit, Multipart, multipart::MultipartError};
use axum::response::{IntoResponse, Redirect, Response};
use rust_decimal::Decimal;

use crate::services::cdn::MAX_UPLOAD_BYTES;
use crate::services::{CloudinaryClient, ImageUpload, UploadError};

/// Name of the file input in every editor.
pub const IMAGE_FIELD: &str = "image";

/// Body limit for editor posts: the image plus room for the text fields.
#[must_use]
pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024)
}

/// A field that failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {0}")]
pub struct InvalidField(pub &'static str);

#[derive(Debug, Default)]
pub struct EditorForm {
    fields: HashMap<String, String>,
    /// Present only when a non-empty file was chosen.
    pub image: Option<ImageUpload>,
}

impl EditorForm {
    /// Drain a multipart body.
    ///
    /// # Errors
    ///
    /// Returns the multipart error if the body is malformed or too large.
    pub async fn read(mut multipart: Multipart) -> Result<Self, MultipartError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(ToOwned::to_owned) else {
                continue;
            };

            if name == IMAGE_FIELD {
                let file_name = field.file_name().unwrap_or("upload").to_owned();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let bytes = field.bytes().await?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
            image: None,
        }
    }

    /// Trimmed text, empty when absent.
    #[must_use]
    pub fn text(&self, name: &str) -> String {
        self.fields
            .get(name)
            .map(|v| v.trim().to_owned())
            .unwrap_or_default()
    }

    /// Trimmed text, `None` when absent or blank.
    #[must_use]
    pub fn optional(&self, name: &str) -> Option<String> {
        Some(self.text(name)).filter(|v| !v.is_empty())
    }

    /// Checkboxes are only sent when ticked.
    #[must_use]
    pub fn checked(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// A whole number; blank reads as zero.
    ///
    /// # Errors
    ///
    /// Returns `InvalidField` for anything that is not an integer.
    pub fn integer(&self, name: &'static str) -> Result<i32, InvalidField> {
        let value = self.text(name);
        if value.is_empty() {
            return Ok(0);
        }
        value.parse().map_err(|_| InvalidField(name))
    }

    /// A money amount. Accepts `1500`, `1500.50`, `1500,50` and a leading `$`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidField` when the value does not parse.
    pub fn decimal(&self, name: &'static str) -> Result<Option<Decimal>, InvalidField> {
        let Some(value) = self.optional(name) else {
            return Ok(None);
        };
        let cleaned = value
            .trim_start_matches('$')
            .trim()
            .replace(',', ".");
        Decimal::from_str(&cleaned)
            .map(Some)
            .map_err(|_| InvalidField(name))
    }

    /// Upload the chosen image, if any, and return its URL.
    ///
    /// # Errors
    ///
    /// Returns the upload error; file problems are logged at info, CDN
    /// failures at error.
    pub async fn upload_image(
        &mut self,
        cdn: &CloudinaryClient,
    ) -> Result<Option<String>, UploadError> {
        let Some(image) = self.image.take() else {
            return Ok(None);
        };
        match cdn.upload(image).await {
            Ok(url) => Ok(Some(url)),
            Err(e) if e.is_user_error() => {
                tracing::info!(error = %e, "Image rejected");
                Err(e)
            }
            Err(e) => {
                tracing::error!(error = %e, "Image upload failed");
                Err(e)
            }
        }
    }
}

/// Redirect target for a rejected editor post.
#[must_use]
pub fn back_with_error(path: &str, code: &str) -> Response {
    Redirect::to(&format!("{path}?error={code}")).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_optional() {
        let form = EditorForm::from_pairs(&[("name", "  Ficus  "), ("subtitle", "   ")]);
        assert_eq!(form.text("name"), "Ficus");
        assert_eq!(form.text("missing"), "");
        assert_eq!(form.optional("subtitle"), None);
        assert_eq!(form.optional("name").as_deref(), Some("Ficus"));
    }

    #[test]
    fn test_checkbox() {
        let form = EditorForm::from_pairs(&[("featured", "on")]);
        assert!(form.checked("featured"));
        assert!(!form.checked("enabled"));
    }

    #[test]
    fn test_integer() {
        let form = EditorForm::from_pairs(&[("stock", "12"), ("position", ""), ("bad", "x")]);
        assert_eq!(form.integer("stock"), Ok(12));
        assert_eq!(form.integer("position"), Ok(0));
        assert_eq!(form.integer("bad"), Err(InvalidField("bad")));
    }

    #[test]
    fn test_decimal_formats() {
        let form = EditorForm::from_pairs(&[
            ("a", "1500"),
            ("b", "$ 1500,50"),
            ("c", "12.5"),
            ("d", "doce"),
        ]);
        assert_eq!(form.decimal("a").unwrap(), Some(Decimal::new(1500, 0)));
        assert_eq!(form.decimal("b").unwrap(), Some(Decimal::new(150_050, 2)));
        assert_eq!(form.decimal("c").unwrap(), Some(Decimal::new(125, 1)));
        assert_eq!(form.decimal("missing").unwrap(), None);
        assert_eq!(form.decimal("d"), Err(InvalidField("d")));
    }
}
