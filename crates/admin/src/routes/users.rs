//! Customer and staff accounts.
//!
//! Admins can promote or demote any account except their own, and delete
//! accounts that never placed an order.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use vivero_core::{UserId, UserRole};
use vivero_storefront::db::{OrderRepository, RepositoryError, UserRepository};
use vivero_storefront::models::{Order, User, UserFilter};

use super::views::{
    AdminUserView, Flash, MessageQuery, Pager, SelectOption, date_time, order_status_class,
    parse_filter, query_string,
};
use crate::{error::AppError, filters, middleware::RequireAdminAuth, state::AppState};

const PER_PAGE: u32 = 30;
const ORDER_HISTORY: i64 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(index))
        .route("/users/{id}", get(show))
        .route("/users/{id}/role", post(change_role))
        .route("/users/{id}/delete", post(delete))
}

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub q: Option<String>,
    pub role: Option<String>,
    pub page: Option<u32>,
    pub error: Option<String>,
    pub success: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct UserRowView {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role_label: &'static str,
    pub is_admin: bool,
    pub joined: String,
}

impl From<&User> for UserRowView {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.as_i32(),
            name: u.name.clone(),
            email: u.email.to_string(),
            phone: u.phone.clone().unwrap_or_default(),
            role_label: u.role.label(),
            is_admin: u.role.is_admin(),
            joined: date_time(&u.created_at),
        }
    }
}

/// A row in the customer's order history.
#[derive(Debug, Clone)]
pub struct UserOrderView {
    pub id: i32,
    pub number: String,
    pub status_label: &'static str,
    pub status_class: &'static str,
    pub total: String,
    pub placed_at: String,
}

impl From<&Order> for UserOrderView {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id.as_i32(),
            number: o.number(),
            status_label: o.status.label(),
            status_class: order_status_class(o.status),
            total: o.total.display(),
            placed_at: date_time(&o.created_at),
        }
    }
}

#[derive(Template)]
#[template(path = "users/index.html")]
pub struct UsersIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Flash,
    pub users: Vec<UserRowView>,
    pub roles: Vec<SelectOption>,
    pub search: String,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "users/show.html")]
pub struct UserShowTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Flash,
    pub user: UserRowView,
    pub roles: Vec<SelectOption>,
    pub orders: Vec<UserOrderView>,
    pub is_self: bool,
}

/// Refuse changes that would lock the acting admin out.
const fn guard_role_change(
    acting: UserId,
    target: UserId,
    role: UserRole,
) -> Result<(), &'static str> {
    if acting.as_i32() == target.as_i32() && !role.is_admin() {
        return Err("self_demote");
    }
    Ok(())
}

#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> Result<Html<String>, AppError> {
    let role = parse_filter::<UserRole>(query.role.as_deref());
    let filter = UserFilter {
        search: query.q.clone(),
        role,
        page: query.page.unwrap_or(1).max(1),
    };

    let page = UserRepository::new(state.pool())
        .list(&filter, PER_PAGE)
        .await?;

    let base_query = query_string(&[
        ("role", role.map(UserRole::as_str)),
        ("q", query.q.as_deref()),
    ]);
    let flash = MessageQuery {
        error: query.error,
        success: query.success,
    }
    .flash();

    let template = UsersIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/users".to_string(),
        flash,
        pager: Pager::new(&page, "/users", &base_query),
        users: page.items.iter().map(UserRowView::from).collect(),
        roles: SelectOption::user_roles(role),
        search: query.q.unwrap_or_default(),
    };
    Ok(Html(template.render()?))
}

#[instrument(skip(admin, state, messages))]
pub async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(messages): Query<MessageQuery>,
) -> Result<Html<String>, AppError> {
    let user_id = UserId::new(id);
    let user_repo = UserRepository::new(state.pool());
    let order_repo = OrderRepository::new(state.pool());
    let user_future = user_repo.get_by_id(user_id);
    let orders_future = order_repo.list_for_user(user_id, ORDER_HISTORY);

    let (user, orders) = tokio::try_join!(user_future, orders_future)?;
    let user = user.ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    let template = UserShowTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/users".to_string(),
        flash: messages.flash(),
        roles: SelectOption::user_roles(Some(user.role)),
        is_self: user.id == admin.id,
        user: UserRowView::from(&user),
        orders: orders.iter().map(UserOrderView::from).collect(),
    };
    Ok(Html(template.render()?))
}

#[instrument(skip(admin, state, form), fields(admin_id = %admin.id, role = %form.role))]
pub async fn change_role(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<RoleForm>,
) -> Result<Response, AppError> {
    let user_id = UserId::new(id);
    let role: UserRole = form
        .role
        .parse()
        .map_err(|_| AppError::BadRequest(format!("unknown role {}", form.role)))?;

    if let Err(code) = guard_role_change(admin.id, user_id, role) {
        return Ok(Redirect::to(&format!("/users/{id}?error={code}")).into_response());
    }

    let user = UserRepository::new(state.pool())
        .set_role(user_id, role)
        .await?;
    tracing::info!(user_id = %user.id, role = %user.role, "User role changed");
    Ok(Redirect::to(&format!("/users/{id}?success=role")).into_response())
}

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let user_id = UserId::new(id);
    if user_id == admin.id {
        return Ok(Redirect::to(&format!("/users/{id}?error=self_delete")).into_response());
    }

    match UserRepository::new(state.pool()).delete(user_id).await {
        Ok(()) => {
            tracing::info!(user_id = id, "User deleted");
            Ok(Redirect::to("/users?success=deleted").into_response())
        }
        Err(RepositoryError::Conflict(_)) => {
            Ok(Redirect::to(&format!("/users/{id}?error=has_orders")).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_cannot_demote_self() {
        let me = UserId::new(1);
        assert_eq!(
            guard_role_change(me, me, UserRole::Customer),
            Err("self_demote")
        );
        assert_eq!(guard_role_change(me, me, UserRole::Admin), Ok(()));
        assert_eq!(
            guard_role_change(me, UserId::new(2), UserRole::Customer),
            Ok(())
        );
    }
}
