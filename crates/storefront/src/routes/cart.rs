//! Cart page and cart actions.
//!
//! Carts belong to logged-in users and are stored as product references.
//! Prices, names and stock are read from the catalog every time the cart is
//! shown, so the page always reflects the current product data.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use vivero_core::{ProductId, validate_quantity};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{CartSummary, CurrentUser};
use crate::state::AppState;

use super::views::{CartItemView, Flash, MessageQuery};

#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i32,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: i32,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: i32,
}

#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub current_user: Option<CurrentUser>,
    pub flash: Flash,
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
    pub checkout_ready: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: i64,
}

#[instrument(skip(state, user, messages), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let items = CartRepository::new(state.pool())
        .items_for_user(user.id)
        .await?;
    let summary = CartSummary::new(items);

    Ok(CartTemplate {
        current_user: Some(user),
        flash: messages.flash(),
        items: summary.items.iter().map(CartItemView::from).collect(),
        subtotal: summary.subtotal.display(),
        item_count: summary.item_count,
        checkout_ready: summary.is_checkout_ready(),
    })
}

/// Add units of a product, summing with what is already in the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let product_id = ProductId::new(form.product_id);
    let Some(product) = ProductRepository::new(state.pool()).get(product_id).await? else {
        return Ok(Redirect::to("/products?error=unavailable").into_response());
    };
    let back = format!("/products/{}", product.slug);

    if !product.state.is_purchasable() {
        return Ok(Redirect::to(&format!("{back}?error=unavailable")).into_response());
    }

    let carts = CartRepository::new(state.pool());
    let requested = form.quantity.unwrap_or(1);
    let in_cart = carts.quantity_of(user.id, product_id).await?;
    if requested == 0
        || validate_quantity(in_cart.saturating_add(requested), product.stock).is_err()
    {
        return Ok(Redirect::to(&format!("{back}?error=stock")).into_response());
    }

    carts.add(user.id, product_id, requested).await?;
    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product", product.slug.as_str())]),
    );

    Ok(Redirect::to("/cart?success=added").into_response())
}

/// Set a line's quantity. Zero removes the line.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response, AppError> {
    let product_id = ProductId::new(form.product_id);
    let carts = CartRepository::new(state.pool());

    if form.quantity == 0 {
        carts.remove(user.id, product_id).await?;
        return Ok(Redirect::to("/cart?success=removed").into_response());
    }

    let stock = ProductRepository::new(state.pool())
        .get(product_id)
        .await?
        .map_or(0, |p| p.stock);
    if validate_quantity(form.quantity, stock).is_err() {
        return Ok(Redirect::to("/cart?error=stock").into_response());
    }

    match carts.set_quantity(user.id, product_id, form.quantity).await {
        Ok(()) => Ok(Redirect::to("/cart?success=updated").into_response()),
        Err(RepositoryError::NotFound) => Ok(Redirect::to("/cart").into_response()),
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response, AppError> {
    CartRepository::new(state.pool())
        .remove(user.id, ProductId::new(form.product_id))
        .await?;
    Ok(Redirect::to("/cart?success=removed").into_response())
}

/// Header badge. Guests always have zero items.
pub async fn count(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse, AppError> {
    let count = match user {
        Some(user) => CartRepository::new(state.pool()).count(user.id).await?,
        None => 0,
    };
    Ok(CartCountTemplate { count })
}
