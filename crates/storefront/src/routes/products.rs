//! Catalog pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use vivero_core::ProductState;

use crate::db::ProductRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{CurrentUser, PAGE_SIZE, ProductFilter, non_blank};
use crate::state::AppState;

use super::views::{Flash, MessageQuery, ProductView};

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
}

impl CatalogQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter {
            category: non_blank(self.category.clone()),
            search: non_blank(self.q.clone()),
            state: None,
            page: self.page.unwrap_or(1).max(1),
        }
    }

    /// Query string for another page of the same listing.
    fn page_link(&self, page: u32) -> String {
        let mut params = vec![format!("page={page}")];
        if let Some(category) = non_blank(self.category.clone()) {
            params.push(format!("category={}", urlencoding::encode(&category)));
        }
        if let Some(q) = non_blank(self.q.clone()) {
            params.push(format!("q={}", urlencoding::encode(&q)));
        }
        format!("/products?{}", params.join("&"))
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub current_user: Option<CurrentUser>,
    pub products: Vec<ProductView>,
    pub categories: Vec<String>,
    pub category: String,
    pub q: String,
    pub current_page: u32,
    pub total_pages: u32,
    pub total: i64,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub current_user: Option<CurrentUser>,
    pub flash: Flash,
    pub product: ProductView,
}

/// Catalog listing with category and text filters.
#[instrument(skip(state, current_user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    Query(query): Query<CatalogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let repo = ProductRepository::new(state.pool());
    let filter = query.filter();
    let page = repo.list_active(&filter, PAGE_SIZE).await?;
    let categories = repo.categories().await?;

    Ok(ProductsIndexTemplate {
        current_user,
        products: page.items.iter().map(ProductView::from).collect(),
        categories,
        category: filter.category.clone().unwrap_or_default(),
        q: filter.search.clone().unwrap_or_default(),
        current_page: page.page,
        total_pages: page.total_pages(),
        total: page.total,
        prev_link: page.has_prev().then(|| query.page_link(page.prev_page())),
        next_link: page.has_next().then(|| query.page_link(page.next_page())),
    })
}

/// Product detail. Hidden products are not found.
#[instrument(skip(state, current_user, messages))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    Path(slug): Path<String>,
    Query(messages): Query<MessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let product = ProductRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .filter(|p| p.state != ProductState::Inactive)
        .ok_or_else(|| AppError::NotFound(format!("product {slug}")))?;

    Ok(ProductShowTemplate {
        current_user,
        flash: messages.flash(),
        product: ProductView::from(&product),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_ignores_blank_params() {
        let query = CatalogQuery {
            category: Some("  ".to_owned()),
            q: Some("ficus".to_owned()),
            page: Some(0),
        };
        let filter = query.filter();
        assert_eq!(filter.category, None);
        assert_eq!(filter.search.as_deref(), Some("ficus"));
        assert_eq!(filter.page, 1);
    }

    #[test]
    fn test_page_link_keeps_filters() {
        let query = CatalogQuery {
            category: Some("interior".to_owned()),
            q: Some("hoja grande".to_owned()),
            page: Some(1),
        };
        assert_eq!(
            query.page_link(2),
            "/products?page=2&category=interior&q=hoja%20grande"
        );
    }
}
