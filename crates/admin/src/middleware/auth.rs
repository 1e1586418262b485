//! Authentication extractors for admin.
//!
//! Admins are ordinary users with the `admin` role, stored in the session
//! under [`session_keys::CURRENT_ADMIN`] so a storefront login never grants
//! back-office access.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::{error, warn};

use vivero_storefront::db::UserRepository;
use vivero_storefront::models::{CurrentUser, User, session_keys};

use crate::state::AppState;

/// Extractor that requires a logged-in admin.
///
/// The role is re-read from the database on every request, so demoting or
/// deleting an account ends its back-office access immediately.
pub struct RequireAdminAuth(pub CurrentUser);

/// Error returned when admin authentication is required.
#[derive(Debug, PartialEq, Eq)]
pub enum AdminAuthRejection {
    RedirectToLogin,
    Unauthorized,
    /// Logged in, but the account was demoted or deleted since.
    Revoked,
    /// The account could not be checked.
    Unavailable,
}

impl IntoResponse for AdminAuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Revoked => Redirect::to("/auth/login?error=not_admin").into_response(),
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    }
}

/// Decide access from the account as it is stored now.
fn live_admin(user: Option<&User>) -> Result<CurrentUser, AdminAuthRejection> {
    match user {
        Some(user) if user.role.is_admin() => Ok(CurrentUser::from(user)),
        _ => Err(AdminAuthRejection::Revoked),
    }
}

impl FromRequestParts<AppState> for RequireAdminAuth {
    type Rejection = AdminAuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AdminAuthRejection::Unauthorized)?;

        let admin: CurrentUser = session
            .get(session_keys::CURRENT_ADMIN)
            .await
            .ok()
            .flatten()
            .ok_or(AdminAuthRejection::RedirectToLogin)?;

        let user = UserRepository::new(state.pool())
            .get_by_id(admin.id)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %admin.id, "failed to load admin account");
                AdminAuthRejection::Unavailable
            })?;

        match live_admin(user.as_ref()) {
            Ok(current) => Ok(Self(current)),
            Err(rejection) => {
                warn!(user_id = %admin.id, "Admin session revoked");
                if let Err(e) = clear_current_admin(&session).await {
                    warn!(error = %e, "failed to clear admin session");
                }
                Err(rejection)
            }
        }
    }
}

/// Extractor that optionally gets the current admin.
pub struct OptionalAdminAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAdminAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let admin = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_ADMIN)
                .await
                .ok()
                .flatten()
                .filter(CurrentUser::is_admin),
            None => None,
        };

        Ok(Self(admin))
    }
}

/// Store the admin in a fresh session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_admin(
    session: &Session,
    admin: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_ADMIN, admin).await
}

/// Helper to clear the current admin from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_admin(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_ADMIN)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use vivero_core::{Email, UserId, UserRole};

    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: UserId::new(7),
            email: Email::parse("marta@vivero.test").unwrap(),
            name: "Marta Gómez".to_owned(),
            phone: None,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_live_admin_keeps_access() {
        let current = live_admin(Some(&user(UserRole::Admin))).unwrap();
        assert_eq!(current.id, UserId::new(7));
        assert!(current.is_admin());
    }

    #[test]
    fn test_demoted_admin_loses_access() {
        assert_eq!(
            live_admin(Some(&user(UserRole::Customer))).unwrap_err(),
            AdminAuthRejection::Revoked
        );
    }

    #[test]
    fn test_deleted_admin_loses_access() {
        assert_eq!(live_admin(None).unwrap_err(), AdminAuthRejection::Revoked);
    }

    #[test]
    fn test_revoked_session_returns_to_login() {
        let response = AdminAuthRejection::Revoked.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[axum::http::header::LOCATION],
            "/auth/login?error=not_admin"
        );
    }
}
