//! Home page and the services listing.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::state::AppState;

use super::views::{ProductView, ServiceView, SlideView};

const FEATURED_LIMIT: i64 = 8;

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub current_user: Option<CurrentUser>,
    pub slides: Vec<SlideView>,
    pub featured: Vec<ProductView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "services.html")]
pub struct ServicesTemplate {
    pub current_user: Option<CurrentUser>,
    pub services: Vec<ServiceView>,
}

/// Enabled slides and featured products.
#[instrument(skip(state, current_user))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
) -> Result<impl IntoResponse, AppError> {
    let slides = state.cache().slides(state.pool()).await?;
    let featured = ProductRepository::new(state.pool())
        .featured(FEATURED_LIMIT)
        .await?;

    Ok(HomeTemplate {
        current_user,
        slides: slides.iter().map(SlideView::from).collect(),
        featured: featured.iter().map(ProductView::from).collect(),
    })
}

/// Active services in display order.
#[instrument(skip(state, current_user))]
pub async fn services(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
) -> Result<impl IntoResponse, AppError> {
    let services = state.cache().services(state.pool()).await?;

    Ok(ServicesTemplate {
        current_user,
        services: services.iter().map(ServiceView::from).collect(),
    })
}
