//! Dashboard route handler.

use askama::Template;
use axum::{extract::State, response::Html};
use tracing::instrument;

use vivero_core::{OrderStatus, ProductState};
use vivero_storefront::db::{
    ErrorLogRepository, OrderRepository, ProductRepository, UserRepository,
};
use vivero_storefront::models::OrderFilter;

use super::orders::OrderRowView;
use super::views::AdminUserView;
use crate::{error::AppError, filters, middleware::RequireAdminAuth, state::AppState};

/// Products at or below this stock show up in the low-stock list.
const LOW_STOCK_THRESHOLD: i32 = 5;
const RECENT_ORDERS: u32 = 8;

/// One status tile.
#[derive(Debug, Clone)]
pub struct StatusCountView {
    pub value: &'static str,
    pub label: &'static str,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub orders: i64,
    pub needs_attention: i64,
    pub revenue: String,
    pub customers: i64,
    pub products_active: i64,
    pub products_inactive: i64,
    pub products_sold: i64,
    pub unresolved_errors: i64,
}

#[derive(Debug, Clone)]
pub struct LowStockView {
    pub id: i32,
    pub name: String,
    pub stock: i32,
}

/// Dashboard template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub metrics: DashboardMetrics,
    pub by_status: Vec<StatusCountView>,
    pub recent_orders: Vec<OrderRowView>,
    pub low_stock: Vec<LowStockView>,
}

/// Dashboard page handler.
#[instrument(skip(admin, state))]
pub async fn dashboard(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    let pool = state.pool();
    let orders = OrderRepository::new(pool);
    let products = ProductRepository::new(pool);
    let users = UserRepository::new(pool);
    let errors = ErrorLogRepository::new(pool);
    let recent_filter = OrderFilter {
        page: 1,
        ..OrderFilter::default()
    };

    let (stats, recent, product_counts, low_stock, customers, unresolved) = tokio::try_join!(
        orders.stats(),
        orders.list_with_users(&recent_filter, RECENT_ORDERS),
        products.count_by_state(),
        products.low_stock(LOW_STOCK_THRESHOLD),
        users.count(),
        errors.count_unresolved(),
    )?;

    let product_count =
        |s: ProductState| product_counts.get(s.as_str()).copied().unwrap_or_default();

    let metrics = DashboardMetrics {
        orders: stats.total_orders(),
        needs_attention: stats.needs_attention(),
        revenue: stats.revenue_display(),
        customers,
        products_active: product_count(ProductState::Active),
        products_inactive: product_count(ProductState::Inactive),
        products_sold: product_count(ProductState::Sold),
        unresolved_errors: unresolved,
    };

    let by_status = OrderStatus::ALL
        .iter()
        .map(|s| StatusCountView {
            value: s.as_str(),
            label: s.label(),
            count: stats.count(*s),
        })
        .collect();

    let template = DashboardTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/".to_string(),
        metrics,
        by_status,
        recent_orders: recent.items.iter().map(OrderRowView::from).collect(),
        low_stock: low_stock
            .iter()
            .map(|p| LowStockView {
                id: p.id.as_i32(),
                name: p.name.clone(),
                stock: p.stock,
            })
            .collect(),
    };

    Ok(Html(template.render()?))
}
