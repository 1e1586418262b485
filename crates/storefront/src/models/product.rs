//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use vivero_core::{CartLine, Price, ProductId, ProductState};

use super::{MissingField, require};

/// A product in the catalog.
#[derive(Debug, Clone)]
pub struct Product {
    pub id: ProductId,
    /// URL-safe unique name used in `/products/{slug}`.
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Price,
    pub stock: i32,
    pub state: ProductState,
    pub image_url: Option<String>,
    /// Shown on the home page.
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Active and with units left.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.state.is_purchasable() && self.stock > 0
    }

    /// Build a checkout line for `quantity` units of this product.
    #[must_use]
    pub const fn line(&self, quantity: u32) -> CartLine {
        CartLine {
            product_id: self.id,
            unit_price: self.price,
            quantity,
            stock: self.stock,
            state: self.state,
        }
    }
}

/// Fields an admin edits on a product.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: Decimal,
    pub stock: i32,
    pub state: ProductState,
    pub image_url: Option<String>,
    pub featured: bool,
}

impl ProductInput {
    /// Check required fields and numeric ranges.
    ///
    /// # Errors
    ///
    /// Returns the first missing or out-of-range field.
    pub fn validate(&self) -> Result<(), MissingField> {
        require("name", &self.name)?;
        require("slug", &self.slug)?;
        require("category", &self.category)?;
        if self.price.is_sign_negative() {
            return Err(MissingField { field: "price" });
        }
        if self.stock < 0 {
            return Err(MissingField { field: "stock" });
        }
        Ok(())
    }
}

/// Catalog filter shared by the storefront listing and the admin list.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    /// Case-insensitive match on name and description.
    pub search: Option<String>,
    /// Admin only; the storefront always lists non-hidden products.
    pub state: Option<ProductState>,
    pub page: u32,
}

impl ProductFilter {
    /// `%term%` pattern for `ILIKE`, with wildcards in the term escaped.
    #[must_use]
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(|s| {
            let escaped = s
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        })
    }
}

/// Derive a URL slug from a product name.
///
/// Lowercases, folds Spanish accents and joins words with `-`.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars().flat_map(char::to_lowercase) {
        let folded = match ch {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            c => c,
        };
        if folded.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(folded);
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Monstera Deliciosa"), "monstera-deliciosa");
        assert_eq!(slugify("  Helecho  Serrucho (grande) "), "helecho-serrucho-grande");
        assert_eq!(slugify("Limonero Eureka Nº 3"), "limonero-eureka-n-3");
        assert_eq!(slugify("Árbol de jade"), "arbol-de-jade");
        assert_eq!(slugify("Ñandubay"), "nandubay");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_search_pattern_escapes_wildcards() {
        let filter = ProductFilter {
            search: Some(" 100% cactus_x ".to_owned()),
            ..ProductFilter::default()
        };
        assert_eq!(
            filter.search_pattern().as_deref(),
            Some("%100\\% cactus\\_x%")
        );

        let blank = ProductFilter {
            search: Some("   ".to_owned()),
            ..ProductFilter::default()
        };
        assert_eq!(blank.search_pattern(), None);
    }

    #[test]
    fn test_validate_requires_fields() {
        let input = ProductInput {
            slug: "ficus".to_owned(),
            name: String::new(),
            description: String::new(),
            category: "interior".to_owned(),
            price: Decimal::new(1000, 0),
            stock: 3,
            state: ProductState::Active,
            image_url: None,
            featured: false,
        };
        assert_eq!(input.validate(), Err(MissingField { field: "name" }));

        let negative = ProductInput {
            name: "Ficus".to_owned(),
            stock: -1,
            ..input
        };
        assert_eq!(negative.validate(), Err(MissingField { field: "stock" }));
    }
}
