//! Seed catalog content from a YAML file.
//!
//! Products are matched by slug, slides by title and services by name, so
//! running the same file twice updates rows instead of duplicating them.
//! The whole file is validated before connecting to the database.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use vivero_core::ProductState;
use vivero_storefront::db::{ProductRepository, ServiceRepository, SlideRepository};
use vivero_storefront::models::{ProductInput, ServiceInput, SlideInput, slugify};

use super::connect;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    #[serde(default)]
    pub products: Vec<ProductSeed>,
    #[serde(default)]
    pub slides: Vec<SlideSeed>,
    #[serde(default)]
    pub services: Vec<ServiceSeed>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductSeed {
    pub name: String,
    /// Derived from the name when omitted.
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub state: ProductState,
    pub image_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SlideSeed {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSeed {
    pub name: String,
    pub description: String,
    pub price_from: Option<Decimal>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "enabled")]
    pub active: bool,
}

const fn enabled() -> bool {
    true
}

impl From<ProductSeed> for ProductInput {
    fn from(seed: ProductSeed) -> Self {
        let slug = slugify(seed.slug.as_deref().unwrap_or(&seed.name));
        Self {
            slug,
            name: seed.name,
            description: seed.description,
            category: seed.category,
            price: seed.price.round_dp(2),
            stock: seed.stock,
            state: seed.state,
            image_url: seed.image_url,
            featured: seed.featured,
        }
    }
}

impl From<SlideSeed> for SlideInput {
    fn from(seed: SlideSeed) -> Self {
        Self {
            title: seed.title,
            subtitle: seed.subtitle,
            image_url: seed.image_url,
            link_url: seed.link_url,
            position: seed.position,
            enabled: seed.enabled,
        }
    }
}

impl From<ServiceSeed> for ServiceInput {
    fn from(seed: ServiceSeed) -> Self {
        Self {
            name: seed.name,
            description: seed.description,
            price_from: seed.price_from.map(|p| p.round_dp(2)),
            image_url: seed.image_url,
            position: seed.position,
            active: seed.active,
        }
    }
}

/// Parsed and validated rows, ready to upsert.
#[derive(Debug, Default)]
pub struct Catalog {
    pub products: Vec<ProductInput>,
    pub slides: Vec<SlideInput>,
    pub services: Vec<ServiceInput>,
}

/// Convert every entry and collect one message per invalid row.
pub fn validate(file: CatalogFile) -> Result<Catalog, Vec<String>> {
    let mut errors = Vec::new();
    let mut catalog = Catalog::default();

    for (i, seed) in file.products.into_iter().enumerate() {
        let input = ProductInput::from(seed);
        match input.validate() {
            Ok(()) => catalog.products.push(input),
            Err(e) => errors.push(format!("products[{i}] ({}): {e}", input.name)),
        }
    }
    for (i, seed) in file.slides.into_iter().enumerate() {
        let input = SlideInput::from(seed);
        match input.validate() {
            Ok(()) => catalog.slides.push(input),
            Err(e) => errors.push(format!("slides[{i}] ({}): {e}", input.title)),
        }
    }
    for (i, seed) in file.services.into_iter().enumerate() {
        let input = ServiceInput::from(seed);
        match input.validate() {
            Ok(()) => catalog.services.push(input),
            Err(e) => errors.push(format!("services[{i}] ({}): {e}", input.name)),
        }
    }

    let mut slugs: Vec<&str> = catalog.products.iter().map(|p| p.slug.as_str()).collect();
    slugs.sort_unstable();
    for pair in slugs.windows(2) {
        if let [a, b] = pair
            && a == b
        {
            errors.push(format!("products: duplicate slug {a}"));
        }
    }

    if errors.is_empty() {
        Ok(catalog)
    } else {
        Err(errors)
    }
}

/// Seed products, slides and services from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any row is
/// invalid, or a database operation fails.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog");
    let content = tokio::fs::read_to_string(path).await?;
    let file: CatalogFile = serde_yaml::from_str(&content)?;

    let catalog = match validate(file) {
        Ok(catalog) => catalog,
        Err(errors) => {
            error!("Catalog validation failed:");
            for err in &errors {
                error!("  - {err}");
            }
            return Err(format!("{} validation errors found", errors.len()).into());
        }
    };
    info!(
        products = catalog.products.len(),
        slides = catalog.slides.len(),
        services = catalog.services.len(),
        "Catalog validated"
    );

    let pool = connect().await?;

    let products = ProductRepository::new(&pool);
    for input in &catalog.products {
        let product = products.upsert_by_slug(input).await?;
        info!(product_id = %product.id, slug = %product.slug, "Product seeded");
    }

    let slides = SlideRepository::new(&pool);
    for input in &catalog.slides {
        slides.upsert_by_title(input).await?;
    }

    let services = ServiceRepository::new(&pool);
    for input in &catalog.services {
        services.upsert_by_name(input).await?;
    }

    info!("Seeding complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../../seed/catalog.yaml");

    #[test]
    fn test_sample_catalog_is_valid() {
        let file: CatalogFile = serde_yaml::from_str(SAMPLE).unwrap();
        let catalog = validate(file).unwrap();
        assert!(!catalog.products.is_empty());
        assert!(!catalog.slides.is_empty());
        assert!(!catalog.services.is_empty());
    }

    #[test]
    fn test_product_defaults_and_slug() {
        let file: CatalogFile = serde_yaml::from_str(
            "products:\n  - name: Potus Dorado\n    category: interior\n    price: 4500.499\n",
        )
        .unwrap();
        let catalog = validate(file).unwrap();
        let product = &catalog.products[0];
        assert_eq!(product.slug, "potus-dorado");
        assert_eq!(product.price, Decimal::new(450_050, 2));
        assert_eq!(product.stock, 0);
        assert_eq!(product.state, ProductState::Active);
        assert!(!product.featured);
    }

    #[test]
    fn test_invalid_rows_are_reported() {
        let yaml = r"
products:
  - name: Helecho
    category: interior
    price: -1
  - name: Helecho
    slug: helecho
    category: interior
    price: 100
  - name: Otro helecho
    slug: helecho
    category: interior
    price: 100
slides:
  - title: Sin imagen
    image_url: ''
services:
  - name: Poda
    description: Poda de frutales
    price_from: 1000
";
        let errors = validate(serde_yaml::from_str(yaml).unwrap()).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("products[0]"));
        assert!(errors[1].starts_with("slides[0]"));
        assert_eq!(errors[2], "products: duplicate slug helecho");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result: Result<CatalogFile, _> =
            serde_yaml::from_str("products:\n  - name: X\n    category: a\n    price: 1\n    colour: red\n");
        assert!(result.is_err());
    }
}
