//! Product catalog management.
//!
//! Editor forms post `multipart/form-data` so an image can ride along; the
//! image goes to the CDN first and only its URL is stored.

use askama::Template;
use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use vivero_core::{ProductId, ProductState};
use vivero_storefront::db::{ProductRepository, RepositoryError};
use vivero_storefront::models::{Product, ProductFilter, ProductInput, slugify};

use super::form::{EditorForm, back_with_error, upload_body_limit};
use super::views::{
    AdminUserView, Flash, MessageQuery, Pager, SelectOption, date_time, parse_filter,
    product_state_class, query_string,
};
use crate::{error::AppError, filters, middleware::RequireAdminAuth, state::AppState};

const PER_PAGE: u32 = 25;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(index).post(create).layer(upload_body_limit()))
        .route("/products/new", get(new_product))
        .route("/products/{id}", post(update).layer(upload_body_limit()))
        .route("/products/{id}/edit", get(edit))
        .route("/products/{id}/delete", post(delete))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub state: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// View types
// =============================================================================

#[derive(Debug, Clone)]
pub struct ProductRowView {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub category: String,
    pub price: String,
    pub stock: i32,
    pub state_label: &'static str,
    pub state_class: &'static str,
    pub featured: bool,
    pub image_url: Option<String>,
    pub updated_at: String,
}

impl From<&Product> for ProductRowView {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id.as_i32(),
            name: p.name.clone(),
            slug: p.slug.clone(),
            category: p.category.clone(),
            price: p.price.display(),
            stock: p.stock,
            state_label: p.state.label(),
            state_class: product_state_class(p.state),
            featured: p.featured,
            image_url: p.image_url.clone(),
            updated_at: date_time(&p.updated_at),
        }
    }
}

/// Values shown in the editor. Empty for a new product.
#[derive(Debug, Clone, Default)]
pub struct ProductFormView {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub stock: i32,
    pub featured: bool,
    pub image_url: Option<String>,
}

impl From<&Product> for ProductFormView {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            slug: p.slug.clone(),
            description: p.description.clone(),
            category: p.category.clone(),
            price: p.price.amount.to_string(),
            stock: p.stock,
            featured: p.featured,
            image_url: p.image_url.clone(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Flash,
    pub products: Vec<ProductRowView>,
    pub states: Vec<SelectOption>,
    pub search: String,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Flash,
    pub title: String,
    pub action: String,
    pub product: ProductFormView,
    pub states: Vec<SelectOption>,
}

// =============================================================================
// Form parsing
// =============================================================================

/// Build the repository input from a posted editor form.
///
/// A blank slug is derived from the name. `image_url` is the URL to keep when
/// no new file was uploaded. Errors are `?error=` codes.
fn product_input(
    form: &EditorForm,
    image_url: Option<String>,
) -> Result<ProductInput, &'static str> {
    let name = form.text("name");
    let slug = form
        .optional("slug")
        .map_or_else(|| slugify(&name), |s| slugify(&s));

    let price = form
        .decimal("price")
        .map_err(|_| "invalid_number")?
        .ok_or("missing_fields")?;
    let stock = form.integer("stock").map_err(|_| "invalid_number")?;
    let state =
        parse_filter::<ProductState>(Some(form.text("state").as_str())).unwrap_or_default();

    let input = ProductInput {
        slug,
        name,
        description: form.text("description"),
        category: form.text("category"),
        price: price.round_dp(2),
        stock,
        state,
        image_url,
        featured: form.checked("featured"),
    };

    input.validate().map_err(|e| match e.field {
        "price" | "stock" => "invalid_number",
        _ => "missing_fields",
    })?;
    Ok(input)
}

/// `?error=` code for a failed save, or the error itself when it is not the
/// admin's to fix.
fn save_error(err: RepositoryError) -> Result<&'static str, AppError> {
    match err {
        RepositoryError::Conflict(_) => Ok("slug_taken"),
        other => Err(other.into()),
    }
}

// =============================================================================
// Handlers
// =============================================================================

#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Html<String>, AppError> {
    let product_state = parse_filter::<ProductState>(query.state.as_deref());
    let filter = ProductFilter {
        state: product_state,
        search: query.q.clone(),
        page: query.page.unwrap_or(1).max(1),
        ..ProductFilter::default()
    };

    let page = ProductRepository::new(state.pool())
        .list_all(&filter, PER_PAGE)
        .await?;

    let base_query = query_string(&[
        ("state", product_state.map(ProductState::as_str)),
        ("q", query.q.as_deref()),
    ]);
    let flash = MessageQuery {
        error: query.error,
        success: query.success,
    }
    .flash();

    let template = ProductsIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/products".to_string(),
        flash,
        pager: Pager::new(&page, "/products", &base_query),
        products: page.items.iter().map(ProductRowView::from).collect(),
        states: SelectOption::product_states(product_state),
        search: query.q.unwrap_or_default(),
    };

    Ok(Html(template.render()?))
}

#[instrument(skip(admin, messages))]
pub async fn new_product(
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<Html<String>, AppError> {
    let template = ProductFormTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/products".to_string(),
        flash: messages.flash(),
        title: "Nuevo producto".to_string(),
        action: "/products".to_string(),
        product: ProductFormView {
            price: Decimal::ZERO.to_string(),
            ..ProductFormView::default()
        },
        states: SelectOption::editable_product_states(ProductState::Active),
    };

    Ok(Html(template.render()?))
}

#[instrument(skip(admin, state, multipart), fields(admin_id = %admin.id))]
pub async fn create(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = EditorForm::read(multipart)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;

    // Validate the text fields before spending an upload on them.
    if let Err(code) = product_input(&form, None) {
        return Ok(back_with_error("/products/new", code));
    }
    let image_url = match form.upload_image(state.cdn()).await {
        Ok(url) => url,
        Err(e) => return Ok(back_with_error("/products/new", e.code())),
    };
    let input = match product_input(&form, image_url) {
        Ok(input) => input,
        Err(code) => return Ok(back_with_error("/products/new", code)),
    };

    match ProductRepository::new(state.pool()).create(&input).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
            Ok(Redirect::to("/products?success=created").into_response())
        }
        Err(e) => Ok(back_with_error("/products/new", save_error(e)?)),
    }
}

#[instrument(skip(admin, state, messages))]
pub async fn edit(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(messages): Query<MessageQuery>,
) -> Result<Html<String>, AppError> {
    let product = ProductRepository::new(state.pool())
        .get(ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let template = ProductFormTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/products".to_string(),
        flash: messages.flash(),
        title: format!("Editar {}", product.name),
        action: format!("/products/{id}"),
        states: SelectOption::editable_product_states(product.state),
        product: ProductFormView::from(&product),
    };

    Ok(Html(template.render()?))
}

#[instrument(skip(admin, state, multipart), fields(admin_id = %admin.id))]
pub async fn update(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let edit_path = format!("/products/{id}/edit");
    let repo = ProductRepository::new(state.pool());
    let product_id = ProductId::new(id);

    let current = repo
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let mut form = EditorForm::read(multipart)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;

    if let Err(code) = product_input(&form, None) {
        return Ok(back_with_error(&edit_path, code));
    }
    let image_url = match form.upload_image(state.cdn()).await {
        Ok(Some(url)) => Some(url),
        Ok(None) if form.checked("remove_image") => None,
        Ok(None) => current.image_url,
        Err(e) => return Ok(back_with_error(&edit_path, e.code())),
    };
    let input = match product_input(&form, image_url) {
        Ok(input) => input,
        Err(code) => return Ok(back_with_error(&edit_path, code)),
    };

    match repo.update(product_id, &input).await {
        Ok(product) => {
            tracing::info!(product_id = %product.id, state = %product.state, "Product updated");
            Ok(Redirect::to(&format!("{edit_path}?success=saved")).into_response())
        }
        Err(e) => Ok(back_with_error(&edit_path, save_error(e)?)),
    }
}

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    ProductRepository::new(state.pool())
        .delete(ProductId::new(id))
        .await?;
    tracing::info!(product_id = id, "Product deleted");
    Ok(Redirect::to("/products?success=deleted").into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(extra: &[(&str, &str)]) -> EditorForm {
        let mut pairs = vec![
            ("name", "Monstera Deliciosa"),
            ("description", "Hojas grandes"),
            ("category", "interior"),
            ("price", "12500,50"),
            ("stock", "4"),
            ("state", "active"),
        ];
        pairs.extend_from_slice(extra);
        EditorForm::from_pairs(&pairs)
    }

    #[test]
    fn test_product_input_derives_slug() {
        let input = product_input(&form(&[]), None).unwrap();
        assert_eq!(input.slug, "monstera-deliciosa");
        assert_eq!(input.price, Decimal::new(1_250_050, 2));
        assert_eq!(input.stock, 4);
        assert_eq!(input.state, ProductState::Active);
        assert!(!input.featured);
    }

    #[test]
    fn test_product_input_normalizes_given_slug() {
        let input = product_input(&form(&[("slug", "Monstera XL"), ("featured", "on")]), None)
            .unwrap();
        assert_eq!(input.slug, "monstera-xl");
        assert!(input.featured);
    }

    #[test]
    fn test_product_input_keeps_image() {
        let input =
            product_input(&form(&[]), Some("https://res.cloudinary.com/x.jpg".into())).unwrap();
        assert_eq!(
            input.image_url.as_deref(),
            Some("https://res.cloudinary.com/x.jpg")
        );
    }

    #[test]
    fn test_product_input_error_codes() {
        assert_eq!(
            product_input(&form(&[("price", "mucho")]), None).unwrap_err(),
            "invalid_number"
        );
        assert_eq!(
            product_input(&form(&[("stock", "-2")]), None).unwrap_err(),
            "invalid_number"
        );
        assert_eq!(
            product_input(&form(&[("category", " ")]), None).unwrap_err(),
            "missing_fields"
        );
        assert_eq!(
            product_input(&EditorForm::from_pairs(&[("name", "Ficus")]), None).unwrap_err(),
            "missing_fields"
        );
    }

    #[test]
    fn test_slug_conflict_is_shown_to_admin() {
        assert_eq!(
            save_error(RepositoryError::Conflict("slug already exists".into())).unwrap(),
            "slug_taken"
        );
        assert!(save_error(RepositoryError::NotFound).is_err());
    }
}
