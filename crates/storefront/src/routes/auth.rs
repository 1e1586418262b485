//! Login, registration and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, client_ip, safe_next, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::{AuthError, AuthService, CaptchaError, Registration};
use crate::state::AppState;

use super::views::{Flash, MessageQuery};

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
    #[serde(rename = "g-recaptcha-response")]
    pub captcha: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub password_confirm: String,
    #[serde(rename = "g-recaptcha-response")]
    pub captcha: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub current_user: Option<CurrentUser>,
    pub flash: Flash,
    pub next: String,
    pub captcha_site_key: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub current_user: Option<CurrentUser>,
    pub flash: Flash,
    pub captcha_site_key: Option<String>,
}

// =============================================================================
// Login
// =============================================================================

pub async fn login_page(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    Query(query): Query<LoginQuery>,
) -> Response {
    let next = safe_next(query.next.as_deref().unwrap_or("/account")).to_owned();
    if current_user.is_some() {
        return Redirect::to(&next).into_response();
    }

    let flash = MessageQuery {
        error: query.error,
        success: query.success,
    }
    .flash();

    LoginTemplate {
        current_user,
        flash,
        next,
        captcha_site_key: state.captcha().site_key().map(str::to_owned),
    }
    .into_response()
}

#[instrument(skip(state, session, headers, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let next = safe_next(form.next.as_deref().unwrap_or("/account")).to_owned();
    let retry = |code: &str| {
        Redirect::to(&format!(
            "/auth/login?error={code}&next={}",
            urlencoding::encode(&next)
        ))
        .into_response()
    };

    if let Err(e) = verify_captcha(&state, &headers, form.captcha.as_deref()).await {
        warn!(error = %e, "Login captcha failed");
        return Ok(retry("captcha"));
    }

    let user = match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) if e.is_user_error() => {
            info!("Login rejected");
            return Ok(retry(AuthError::InvalidCredentials.code()));
        }
        Err(e) => return Err(e.into()),
    };

    start_session(&session, &user).await?;
    Ok(Redirect::to(&next).into_response())
}

// =============================================================================
// Registration
// =============================================================================

pub async fn register_page(
    State(state): State<AppState>,
    OptionalAuth(current_user): OptionalAuth,
    Query(messages): Query<MessageQuery>,
) -> Response {
    if current_user.is_some() {
        return Redirect::to("/account").into_response();
    }

    RegisterTemplate {
        current_user,
        flash: messages.flash(),
        captcha_site_key: state.captcha().site_key().map(str::to_owned),
    }
    .into_response()
}

/// Create the account, log the customer in and send the welcome email.
#[instrument(skip(state, session, headers, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if let Err(e) = verify_captcha(&state, &headers, form.captcha.as_deref()).await {
        warn!(error = %e, "Registration captcha failed");
        return Ok(Redirect::to("/auth/register?error=captcha").into_response());
    }

    let registration = Registration {
        name: form.name,
        email: form.email,
        phone: form.phone,
        password: form.password,
        password_confirm: form.password_confirm,
    };

    let user = match AuthService::new(state.pool()).register(&registration).await {
        Ok(user) => user,
        Err(e) if e.is_user_error() => {
            return Ok(Redirect::to(&format!("/auth/register?error={}", e.code())).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = %user.id, "Customer registered");
    start_session(&session, &user).await?;

    let email = state.email().clone();
    let to = user.email.to_string();
    let name = user.name.clone();
    tokio::spawn(async move {
        if let Err(e) = email.send_welcome(&to, &name).await {
            warn!(error = %e, "failed to send welcome email");
        }
    });

    Ok(Redirect::to("/account?success=registered").into_response())
}

// =============================================================================
// Logout
// =============================================================================

pub async fn logout(session: Session) -> Result<Response, AppError> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session: {e}")))?;
    clear_sentry_user();
    Ok(Redirect::to("/?success=logged_out").into_response())
}

// =============================================================================
// Helpers
// =============================================================================

async fn verify_captcha(
    state: &AppState,
    headers: &HeaderMap,
    token: Option<&str>,
) -> Result<(), CaptchaError> {
    let ip = client_ip(headers).map(|ip| ip.to_string());
    state.captcha().verify(token, ip.as_deref()).await
}

async fn start_session(session: &Session, user: &User) -> Result<(), AppError> {
    let current = CurrentUser::from(user);
    set_current_user(session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}
