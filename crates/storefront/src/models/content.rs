//! Home-page slides and the services listing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use vivero_core::{Price, ServiceId, SlideId};

use super::{MissingField, require};

/// Promotional banner shown on the home page while enabled.
#[derive(Debug, Clone)]
pub struct Slide {
    pub id: SlideId,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    /// Ascending display order.
    pub position: i32,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct SlideInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub position: i32,
    pub enabled: bool,
}

impl SlideInput {
    /// # Errors
    ///
    /// Title and image are required.
    pub fn validate(&self) -> Result<(), MissingField> {
        require("title", &self.title)?;
        require("image_url", &self.image_url)?;
        Ok(())
    }
}

/// A service the nursery offers (landscaping, pruning, ...).
#[derive(Debug, Clone)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub description: String,
    /// "Desde $ X" starting price; `None` means quoted on request.
    pub price_from: Option<Price>,
    pub image_url: Option<String>,
    pub position: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceInput {
    pub name: String,
    pub description: String,
    pub price_from: Option<Decimal>,
    pub image_url: Option<String>,
    pub position: i32,
    pub active: bool,
}

impl ServiceInput {
    /// # Errors
    ///
    /// Name and description are required; a starting price cannot be negative.
    pub fn validate(&self) -> Result<(), MissingField> {
        require("name", &self.name)?;
        require("description", &self.description)?;
        if self.price_from.is_some_and(|p| p.is_sign_negative()) {
            return Err(MissingField { field: "price_from" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slide_requires_image() {
        let slide = SlideInput {
            title: "Otoño".to_owned(),
            ..SlideInput::default()
        };
        assert_eq!(slide.validate(), Err(MissingField { field: "image_url" }));
    }

    #[test]
    fn test_service_rejects_negative_price() {
        let service = ServiceInput {
            name: "Poda".to_owned(),
            description: "Poda de árboles".to_owned(),
            price_from: Some(Decimal::new(-1, 0)),
            ..ServiceInput::default()
        };
        assert_eq!(
            service.validate(),
            Err(MissingField { field: "price_from" })
        );
    }
}
