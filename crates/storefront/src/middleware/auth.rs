//! Authentication extractors for storefront customers.
//!
//! The logged-in user lives in the session under
//! [`session_keys::CURRENT_USER`]. Admin sessions use a different key, so
//! logging into one app never logs into the other.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a logged-in customer.
///
/// Page requests without one are redirected to the login page, keeping the
/// path they asked for in `?next=`.
pub struct RequireAuth(pub CurrentUser);

pub enum AuthRejection {
    RedirectToLogin(String),
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(next) => Redirect::to(&format!(
                "/auth/login?next={}",
                urlencoding::encode(&next)
            ))
            .into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        let user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AuthRejection::RedirectToLogin(login_target(parts)))?;

        Ok(Self(user))
    }
}

/// Extractor for pages that look different when logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Where to come back to after logging in. Form posts return to the page
/// that holds the form rather than to the action URL.
///
/// Nested routers see the URI with their prefix stripped, so the full path
/// comes from [`OriginalUri`].
fn login_target(parts: &Parts) -> String {
    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path(), |original| original.0.path());
    if parts.method == axum::http::Method::GET {
        safe_next(path).to_owned()
    } else if path.starts_with("/cart") {
        "/cart".to_owned()
    } else if path.starts_with("/checkout") {
        "/checkout".to_owned()
    } else {
        "/account".to_owned()
    }
}

/// Only same-site absolute paths are accepted as post-login targets.
#[must_use]
pub fn safe_next(next: &str) -> &str {
    if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') {
        next
    } else {
        "/account"
    }
}

/// Store the logged-in user and rotate the session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Log out.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next("/checkout"), "/checkout");
        assert_eq!(safe_next("//evil.example"), "/account");
        assert_eq!(safe_next("https://evil.example"), "/account");
        assert_eq!(safe_next("/\\evil"), "/account");
    }
}
