//! Persisted server errors from both apps.

use askama::Template;
use axum::{
    Router,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use vivero_core::ErrorLogId;
use vivero_storefront::db::ErrorLogRepository;
use vivero_storefront::models::{ErrorLog, ErrorLogFilter};

use super::views::{AdminUserView, Flash, MessageQuery, Pager, date_time};
use crate::{error::AppError, filters, middleware::RequireAdminAuth, state::AppState};

const PER_PAGE: u32 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/errors", get(index))
        .route("/errors/purge", post(purge))
        .route("/errors/{id}/resolve", post(resolve))
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorsQuery {
    /// Any value includes resolved entries.
    pub all: Option<String>,
    pub page: Option<u32>,
    pub error: Option<String>,
    pub success: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ErrorLogView {
    pub id: i32,
    pub source: String,
    pub method: String,
    pub path: String,
    pub status: i32,
    pub message: String,
    pub detail: String,
    pub request_id: String,
    pub user_id: Option<i32>,
    pub resolved: bool,
    pub resolved_at: String,
    pub created_at: String,
}

impl From<&ErrorLog> for ErrorLogView {
    fn from(e: &ErrorLog) -> Self {
        Self {
            id: e.id.as_i32(),
            source: e.source.clone(),
            method: e.method.clone(),
            path: e.path.clone(),
            status: e.status,
            message: e.message.clone(),
            detail: e.detail.clone().unwrap_or_default(),
            request_id: e.request_id.clone().unwrap_or_default(),
            user_id: e.user_id.map(|id| id.as_i32()),
            resolved: e.resolved,
            resolved_at: e.resolved_at.as_ref().map(date_time).unwrap_or_default(),
            created_at: date_time(&e.created_at),
        }
    }
}

#[derive(Template)]
#[template(path = "errors/index.html")]
pub struct ErrorsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Flash,
    pub errors: Vec<ErrorLogView>,
    pub show_all: bool,
    pub unresolved: i64,
    pub pager: Pager,
}

#[instrument(skip(admin, state))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Query(query): Query<ErrorsQuery>,
) -> Result<Html<String>, AppError> {
    let show_all = query.all.is_some();
    let filter = ErrorLogFilter {
        include_resolved: show_all,
        page: query.page.unwrap_or(1).max(1),
    };

    let repo = ErrorLogRepository::new(state.pool());
    let (page, unresolved) =
        tokio::try_join!(repo.list(&filter, PER_PAGE), repo.count_unresolved())?;

    let flash = MessageQuery {
        error: query.error,
        success: query.success,
    }
    .flash();

    let template = ErrorsIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/errors".to_string(),
        flash,
        pager: Pager::new(&page, "/errors", if show_all { "all=1" } else { "" }),
        errors: page.items.iter().map(ErrorLogView::from).collect(),
        show_all,
        unresolved,
    };
    Ok(Html(template.render()?))
}

#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn resolve(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    ErrorLogRepository::new(state.pool())
        .mark_resolved(ErrorLogId::new(id))
        .await?;
    Ok(Redirect::to("/errors?success=resolved").into_response())
}

/// Delete every resolved entry.
#[instrument(skip(admin, state), fields(admin_id = %admin.id))]
pub async fn purge(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let deleted = ErrorLogRepository::new(state.pool())
        .delete_resolved()
        .await?;
    tracing::info!(deleted, "Resolved errors purged");
    Ok(Redirect::to("/errors?success=purged").into_response())
}
