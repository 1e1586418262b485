//! Order management: list, detail, status changes and cancellation.
//!
//! Status changes go through [`OrderService`] so the lifecycle rules, the
//! stock restore on cancellation and the customer email are the same ones the
//! storefront uses.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use vivero_core::{OrderId, OrderStatus};
use vivero_storefront::db::OrderRepository;
use vivero_storefront::models::{OrderFilter, OrderSummary};
use vivero_storefront::routes::views::OrderItemView;
use vivero_storefront::services::{OrderError, OrderService};

use super::views::{
    AdminUserView, Flash, MessageQuery, Pager, SelectOption, date_time, order_status_class,
    parse_filter, query_string,
};
use crate::{error::AppError, filters, middleware::RequireAdminAuth, state::AppState};

const PER_PAGE: u32 = 25;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(index))
        .route("/orders/{id}", get(show))
        .route("/orders/{id}/status", post(change_status))
        .route("/orders/{id}/cancel", post(cancel))
}

// =============================================================================
// Query / form types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
    pub q: Option<String>,
    pub page: Option<u32>,
    pub error: Option<String>,
    pub success: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

// =============================================================================
// View types
// =============================================================================

/// One row in an order table.
#[derive(Debug, Clone)]
pub struct OrderRowView {
    pub id: i32,
    pub number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub status_label: &'static str,
    pub status_class: &'static str,
    pub payment_label: &'static str,
    pub delivery_label: &'static str,
    pub item_count: i64,
    pub total: String,
    pub placed_at: String,
}

impl From<&OrderSummary> for OrderRowView {
    fn from(s: &OrderSummary) -> Self {
        let o = &s.order;
        Self {
            id: o.id.as_i32(),
            number: o.number(),
            customer_name: s.customer_name.clone(),
            customer_email: s.customer_email.to_string(),
            status_label: o.status.label(),
            status_class: order_status_class(o.status),
            payment_label: o.payment_method.label(),
            delivery_label: o.delivery_method.label(),
            item_count: s.item_count,
            total: o.total.display(),
            placed_at: date_time(&o.created_at),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderDetailView {
    pub row: OrderRowView,
    pub customer_id: i32,
    pub shipping_address: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
    pub subtotal: String,
    pub shipping_cost: String,
    pub payment_reference: Option<String>,
    pub payment_id: Option<String>,
    pub payment_status: Option<String>,
    pub updated_at: String,
    pub can_cancel: bool,
}

impl From<&OrderSummary> for OrderDetailView {
    fn from(s: &OrderSummary) -> Self {
        let o = &s.order;
        Self {
            row: OrderRowView::from(s),
            customer_id: o.user_id.as_i32(),
            shipping_address: o.shipping_address.clone(),
            contact_phone: o.contact_phone.clone(),
            notes: o.notes.clone(),
            subtotal: o.subtotal.display(),
            shipping_cost: o.shipping_cost.display(),
            payment_reference: o.payment_reference.clone(),
            payment_id: o.payment_id.clone(),
            payment_status: o.payment_status.clone(),
            updated_at: date_time(&o.updated_at),
            can_cancel: o.status.can_transition_to(OrderStatus::Cancelled),
        }
    }
}

/// Statuses an order can move to next, excluding cancellation which has its
/// own button.
fn next_status_options(status: OrderStatus) -> Vec<SelectOption> {
    status
        .next_statuses()
        .into_iter()
        .filter(|s| *s != OrderStatus::Cancelled)
        .map(|s| SelectOption {
            value: s.as_str(),
            label: s.label(),
            selected: false,
        })
        .collect()
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Flash,
    pub orders: Vec<OrderRowView>,
    pub statuses: Vec<SelectOption>,
    pub search: String,
    pub pager: Pager,
}

#[derive(Template)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Flash,
    pub order: OrderDetailView,
    pub items: Vec<OrderItemView>,
    pub next_statuses: Vec<SelectOption>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Order list, filterable by status and customer/number search.
#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<OrdersQuery>,
) -> Result<Html<String>, AppError> {
    let status = parse_filter::<OrderStatus>(query.status.as_deref());
    let filter = OrderFilter {
        status,
        search: query.q.clone(),
        page: query.page.unwrap_or(1).max(1),
    };

    let page = OrderRepository::new(state.pool())
        .list_with_users(&filter, PER_PAGE)
        .await?;

    let base_query = query_string(&[
        ("status", status.map(OrderStatus::as_str)),
        ("q", query.q.as_deref()),
    ]);
    let flash = MessageQuery {
        error: query.error,
        success: query.success,
    }
    .flash();

    let template = OrdersIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/orders".to_string(),
        flash,
        pager: Pager::new(&page, "/orders", &base_query),
        orders: page.items.iter().map(OrderRowView::from).collect(),
        statuses: SelectOption::order_statuses(status),
        search: query.q.unwrap_or_default(),
    };

    Ok(Html(template.render()?))
}

/// Order detail with items, customer and the allowed next statuses.
#[instrument(skip(admin, state, messages))]
pub async fn show(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(messages): Query<MessageQuery>,
) -> Result<Html<String>, AppError> {
    let repo = OrderRepository::new(state.pool());
    let order_id = OrderId::new(id);

    let summary = repo
        .get_with_user(order_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    let items = repo.items(order_id).await?;

    let template = OrderShowTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/orders".to_string(),
        flash: messages.flash(),
        next_statuses: next_status_options(summary.order.status),
        order: OrderDetailView::from(&summary),
        items: items.iter().map(OrderItemView::from).collect(),
    };

    Ok(Html(template.render()?))
}

/// Move an order to the submitted status.
#[instrument(skip(admin, state, form), fields(admin_id = %admin.id, to = %form.status))]
pub async fn change_status(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<StatusForm>,
) -> Result<Response, AppError> {
    let Ok(next) = form.status.parse::<OrderStatus>() else {
        return Ok(redirect_to_order(id, "error=invalid_transition"));
    };

    let result = OrderService::new(state.pool(), state.email())
        .change_status(OrderId::new(id), next)
        .await;
    outcome(id, result.map(|_| ()), "success=status")
}

/// Cancel an order and put its stock back.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn cancel(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let result = OrderService::new(state.pool(), state.email())
        .cancel_by_admin(OrderId::new(id))
        .await;
    outcome(id, result.map(|_| ()), "success=cancelled")
}

fn redirect_to_order(id: i32, query: &str) -> Response {
    Redirect::to(&format!("/orders/{id}?{query}")).into_response()
}

/// Lifecycle refusals go back to the order page; anything else is an error.
fn outcome(id: i32, result: Result<(), OrderError>, success: &str) -> Result<Response, AppError> {
    match result {
        Ok(()) => Ok(redirect_to_order(id, success)),
        Err(e @ (OrderError::InvalidTransition { .. } | OrderError::NotCancellable(_))) => {
            tracing::info!(order_id = id, reason = %e, "Order change refused");
            Ok(redirect_to_order(id, &format!("error={}", e.code())))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_next_status_options_exclude_cancel() {
        let options = next_status_options(OrderStatus::Confirmed);
        assert!(options.iter().all(|o| o.value != "cancelled"));
        assert!(options.iter().any(|o| o.value == "shipped"));
    }

    #[test]
    fn test_terminal_status_has_no_options() {
        assert!(next_status_options(OrderStatus::Delivered).is_empty());
        assert!(next_status_options(OrderStatus::Cancelled).is_empty());
    }

    #[test]
    fn test_refused_transition_redirects_with_code() {
        let response = outcome(
            7,
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending,
            }),
            "success=status",
        )
        .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()["location"],
            "/orders/7?error=invalid_transition"
        );
    }

    #[test]
    fn test_missing_order_is_an_error() {
        assert!(matches!(
            outcome(7, Err(OrderError::NotFound), "success=status"),
            Err(AppError::Order(OrderError::NotFound))
        ));
    }
}
