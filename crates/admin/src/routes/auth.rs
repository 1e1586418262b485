//! Authentication route handlers for admin.
//!
//! Staff log in with their storefront email and password; only accounts with
//! the admin role get a back-office session.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use vivero_storefront::models::CurrentUser;
use vivero_storefront::services::{AuthError, AuthService};

use super::views::{Flash, MessageQuery};
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{
    OptionalAdminAuth, auth_rate_limiter, clear_current_admin, set_current_admin,
};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Login page template.
#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginPageTemplate {
    flash: Flash,
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/login",
            get(login_page).merge(post(login).layer(auth_rate_limiter())),
        )
        .route("/auth/logout", post(logout))
}

/// GET /auth/login
async fn login_page(
    OptionalAdminAuth(admin): OptionalAdminAuth,
    Query(messages): Query<MessageQuery>,
) -> Result<Response, AppError> {
    if admin.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    let template = LoginPageTemplate {
        flash: messages.flash(),
    };
    Ok(Html(template.render()?).into_response())
}

/// POST /auth/login
#[instrument(skip(state, session, form))]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) if e.is_user_error() => {
            info!("Admin login rejected");
            return Ok(Redirect::to(&format!(
                "/auth/login?error={}",
                AuthError::InvalidCredentials.code()
            ))
            .into_response());
        }
        Err(e) => return Err(e.into()),
    };

    if !user.role.is_admin() {
        warn!(user_id = %user.id, "Non-admin tried to log into the back-office");
        return Ok(Redirect::to("/auth/login?error=not_admin").into_response());
    }

    set_current_admin(&session, &CurrentUser::from(&user))
        .await
        .map_err(|e| AppError::Internal(format!("session: {e}")))?;
    set_sentry_user(user.id.as_i32(), Some(user.email.as_str()));
    info!(user_id = %user.id, "Admin logged in");

    Ok(Redirect::to("/").into_response())
}

/// POST /auth/logout
async fn logout(session: Session) -> impl IntoResponse {
    if let Err(e) = clear_current_admin(&session).await {
        warn!(error = %e, "failed to clear admin session");
    }
    clear_sentry_user();
    Redirect::to("/auth/login")
}
