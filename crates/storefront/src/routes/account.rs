//! Customer account: profile, password, orders and saved addresses.
//!
//! Every handler requires a logged-in customer and only ever touches rows
//! owned by that customer. Someone else's order or address looks missing.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use vivero_core::{AddressId, OrderId};

use crate::db::{AddressRepository, OrderRepository, RepositoryError, UserRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAuth, set_current_user};
use crate::models::{AddressInput, CurrentUser, ProfileUpdate, non_blank};
use crate::services::auth::validate_phone;
use crate::services::{AuthError, AuthService, OrderError, OrderService};
use crate::state::AppState;

use super::views::{AddressView, Flash, MessageQuery, OrderItemView, OrderView};

const RECENT_ORDERS: i64 = 5;
const ORDER_HISTORY_LIMIT: i64 = 200;

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct AddressForm {
    pub label: String,
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub notes: Option<String>,
    /// Checkbox: present only when ticked.
    pub is_default: Option<String>,
}

impl From<AddressForm> for AddressInput {
    fn from(form: AddressForm) -> Self {
        Self {
            label: form.label,
            street: form.street,
            city: form.city,
            province: form.province,
            postal_code: form.postal_code,
            notes: form.notes,
            is_default: form.is_default.is_some(),
        }
        .normalized()
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub current_user: Option<CurrentUser>,
    pub flash: Flash,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub recent_orders: Vec<OrderView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub current_user: Option<CurrentUser>,
    pub flash: Flash,
    pub orders: Vec<OrderView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/order.html")]
pub struct OrderTemplate {
    pub current_user: Option<CurrentUser>,
    pub flash: Flash,
    pub order: OrderView,
    pub items: Vec<OrderItemView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/addresses.html")]
pub struct AddressesTemplate {
    pub current_user: Option<CurrentUser>,
    pub flash: Flash,
    pub addresses: Vec<AddressView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "account/address_form.html")]
pub struct AddressFormTemplate {
    pub current_user: Option<CurrentUser>,
    pub flash: Flash,
    /// `None` for a new address.
    pub address: Option<AddressView>,
    pub action: String,
}

// =============================================================================
// Profile
// =============================================================================

/// Profile form and the latest orders.
#[instrument(skip(state, user, messages), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<Response, AppError> {
    let Some(profile) = UserRepository::new(state.pool())
        .get_by_id(user.id)
        .await?
    else {
        return Ok(Redirect::to("/auth/login").into_response());
    };
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id, RECENT_ORDERS)
        .await?;

    Ok(AccountTemplate {
        current_user: Some(user),
        flash: messages.flash(),
        name: profile.name,
        email: profile.email.to_string(),
        phone: profile.phone.unwrap_or_default(),
        recent_orders: orders.iter().map(OrderView::from).collect(),
    }
    .into_response())
}

#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let name = form.name.trim().to_owned();
    if name.is_empty() {
        return Ok(Redirect::to("/account?error=missing_fields").into_response());
    }
    let phone = non_blank(form.phone);
    if let Some(phone) = &phone
        && validate_phone(phone).is_err()
    {
        return Ok(Redirect::to("/account?error=invalid_phone").into_response());
    }

    let updated = UserRepository::new(state.pool())
        .update_profile(user.id, &ProfileUpdate { name, phone })
        .await?;

    if let Err(e) = set_current_user(&session, &CurrentUser::from(&updated)).await {
        warn!(error = %e, "failed to refresh session after profile update");
    }

    Ok(Redirect::to("/account?success=profile").into_response())
}

#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<PasswordForm>,
) -> Result<Response, AppError> {
    let result = AuthService::new(state.pool())
        .change_password(
            user.id,
            &form.current_password,
            &form.new_password,
            &form.new_password_confirm,
        )
        .await;

    match result {
        Ok(()) => Ok(Redirect::to("/account?success=password").into_response()),
        Err(e) if e.is_user_error() => {
            Ok(Redirect::to(&format!("/account?error={}", e.code())).into_response())
        }
        Err(AuthError::UserNotFound) => Ok(Redirect::to("/auth/login").into_response()),
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Orders
// =============================================================================

#[instrument(skip(state, user, messages), fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id, ORDER_HISTORY_LIMIT)
        .await?;

    Ok(OrdersTemplate {
        current_user: Some(user),
        flash: messages.flash(),
        orders: orders.iter().map(OrderView::from).collect(),
    })
}

#[instrument(skip(state, user, messages), fields(user_id = %user.id))]
pub async fn order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Query(messages): Query<MessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get(OrderId::new(id))
        .await?
        .filter(|o| o.user_id == user.id)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    let items = repo.items(order.id).await?;

    Ok(OrderTemplate {
        current_user: Some(user),
        flash: messages.flash(),
        order: OrderView::from(&order),
        items: items.iter().map(OrderItemView::from).collect(),
    })
}

/// Cancel a pending order. Stock goes back to the catalog.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let back = format!("/account/orders/{id}");
    let result = OrderService::new(state.pool(), state.email())
        .cancel_for_customer(user.id, OrderId::new(id))
        .await;

    match result {
        Ok(_) => Ok(Redirect::to(&format!("{back}?success=cancelled")).into_response()),
        Err(OrderError::NotCancellable(_) | OrderError::InvalidTransition { .. }) => {
            Ok(Redirect::to(&format!("{back}?error=not_cancellable")).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Addresses
// =============================================================================

#[instrument(skip(state, user, messages), fields(user_id = %user.id))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;

    Ok(AddressesTemplate {
        current_user: Some(user),
        flash: messages.flash(),
        addresses: addresses.iter().map(AddressView::from).collect(),
    })
}

pub async fn new_address(
    RequireAuth(user): RequireAuth,
    Query(messages): Query<MessageQuery>,
) -> impl IntoResponse {
    AddressFormTemplate {
        current_user: Some(user),
        flash: messages.flash(),
        address: None,
        action: "/account/addresses".to_owned(),
    }
}

#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddressForm>,
) -> Result<Response, AppError> {
    let input = AddressInput::from(form);
    if input.validate().is_err() {
        return Ok(Redirect::to("/account/addresses/new?error=missing_fields").into_response());
    }

    AddressRepository::new(state.pool())
        .create(user.id, &input)
        .await?;
    Ok(Redirect::to("/account/addresses?success=address_saved").into_response())
}

pub async fn edit_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Query(messages): Query<MessageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let address = AddressRepository::new(state.pool())
        .get(user.id, AddressId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("address {id}")))?;

    Ok(AddressFormTemplate {
        current_user: Some(user),
        flash: messages.flash(),
        address: Some(AddressView::from(&address)),
        action: format!("/account/addresses/{id}"),
    })
}

#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Form(form): Form<AddressForm>,
) -> Result<Response, AppError> {
    let input = AddressInput::from(form);
    if input.validate().is_err() {
        return Ok(
            Redirect::to(&format!("/account/addresses/{id}/edit?error=missing_fields"))
                .into_response(),
        );
    }

    match AddressRepository::new(state.pool())
        .update(user.id, AddressId::new(id), &input)
        .await
    {
        Ok(_) => Ok(Redirect::to("/account/addresses?success=address_saved").into_response()),
        Err(RepositoryError::NotFound) => Err(AppError::NotFound(format!("address {id}"))),
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    match AddressRepository::new(state.pool())
        .delete(user.id, AddressId::new(id))
        .await
    {
        Ok(()) | Err(RepositoryError::NotFound) => {
            Ok(Redirect::to("/account/addresses?success=address_deleted").into_response())
        }
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn set_default_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    match AddressRepository::new(state.pool())
        .set_default(user.id, AddressId::new(id))
        .await
    {
        Ok(()) => Ok(Redirect::to("/account/addresses?success=default_address").into_response()),
        Err(RepositoryError::NotFound) => Err(AppError::NotFound(format!("address {id}"))),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_form_normalizes() {
        let form = AddressForm {
            label: " Casa ".to_owned(),
            street: "Av. Siempre Viva 742".to_owned(),
            city: "Rosario".to_owned(),
            province: "Santa Fe".to_owned(),
            postal_code: "2000".to_owned(),
            notes: Some("   ".to_owned()),
            is_default: Some("on".to_owned()),
        };
        let input = AddressInput::from(form);
        assert_eq!(input.label, "Casa");
        assert_eq!(input.notes, None);
        assert!(input.is_default);
        assert!(input.validate().is_ok());
    }
}
