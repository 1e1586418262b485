//! Authentication service.
//!
//! Password accounts with Argon2id hashes.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use vivero_core::{Email, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::models::{User, non_blank, require};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Minimum digits in a phone number.
const MIN_PHONE_DIGITS: usize = 8;

/// Sign-up form fields.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Create a customer account.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name, bad email, bad phone, a
    /// short password or a confirmation mismatch, and
    /// `AuthError::UserAlreadyExists` if the email is taken.
    pub async fn register(&self, form: &Registration) -> Result<User, AuthError> {
        let validated = validate_registration(form)?;
        let password_hash = hash_password(&form.password)?;

        self.users
            .create_with_password(
                &validated.email,
                &validated.name,
                validated.phone.as_deref(),
                &password_hash,
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let Some(password_hash) = self.users.get_password_hash(&email).await? else {
            // Burn comparable time so unknown emails are not distinguishable.
            let _ = hash_password(password);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;

        self.users
            .get_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }

    /// Replace a password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong, and the
    /// usual password validation errors for `new`.
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> Result<(), AuthError> {
        let hash = self
            .users
            .get_password_hash_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        verify_password(current, &hash)?;

        validate_password(new, confirm)?;
        let new_hash = hash_password(new)?;
        self.users.update_password(user_id, &new_hash).await?;
        Ok(())
    }
}

/// Registration input after validation and normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
}

/// Check a sign-up form without touching the database.
///
/// # Errors
///
/// Returns the first problem found.
pub fn validate_registration(form: &Registration) -> Result<ValidRegistration, AuthError> {
    require("name", &form.name)?;
    require("email", &form.email)?;
    require("password", &form.password)?;

    let email = Email::parse(&form.email)?;
    let phone = non_blank(form.phone.clone());
    if let Some(phone) = &phone {
        validate_phone(phone)?;
    }
    validate_password(&form.password, &form.password_confirm)?;

    Ok(ValidRegistration {
        name: form.name.trim().to_owned(),
        email,
        phone,
    })
}

/// Digits with optional `+`, spaces, dashes and parentheses.
///
/// # Errors
///
/// Returns `AuthError::InvalidPhone`.
pub fn validate_phone(phone: &str) -> Result<(), AuthError> {
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if allowed && digits >= MIN_PHONE_DIGITS {
        Ok(())
    } else {
        Err(AuthError::InvalidPhone)
    }
}

fn validate_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password != confirm {
        return Err(AuthError::PasswordMismatch);
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> Registration {
        Registration {
            name: " Lucía Gómez ".to_owned(),
            email: "Lucia@Example.com".to_owned(),
            phone: Some("+54 11 5555-1234".to_owned()),
            password: "helechos123".to_owned(),
            password_confirm: "helechos123".to_owned(),
        }
    }

    #[test]
    fn test_validate_registration_normalizes() {
        let valid = validate_registration(&form()).unwrap();
        assert_eq!(valid.name, "Lucía Gómez");
        assert_eq!(valid.email.as_str(), "lucia@example.com");
        assert_eq!(valid.phone.as_deref(), Some("+54 11 5555-1234"));
    }

    #[test]
    fn test_validate_registration_missing_name() {
        let mut f = form();
        f.name = "   ".to_owned();
        assert!(matches!(
            validate_registration(&f),
            Err(AuthError::MissingField(m)) if m.field == "name"
        ));
    }

    #[test]
    fn test_validate_registration_password_rules() {
        let mut short = form();
        short.password = "corta".to_owned();
        short.password_confirm = "corta".to_owned();
        assert!(matches!(
            validate_registration(&short),
            Err(AuthError::WeakPassword(_))
        ));

        let mut mismatch = form();
        mismatch.password_confirm = "helechos124".to_owned();
        assert!(matches!(
            validate_registration(&mismatch),
            Err(AuthError::PasswordMismatch)
        ));
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("011 4555-1234").is_ok());
        assert!(validate_phone("1234").is_err());
        assert!(validate_phone("11-call-me").is_err());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("monstera-2024").unwrap();
        assert!(verify_password("monstera-2024", &hash).is_ok());
        assert!(matches!(
            verify_password("monstera-2025", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
