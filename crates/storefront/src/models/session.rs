//! Session-related types.

use serde::{Deserialize, Serialize};

use vivero_core::{Email, UserId, UserRole};

/// Session-stored user identity.
///
/// Only what the layout and the ownership checks need; everything else is
/// loaded from the database per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// First word of the name, for the header greeting.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

impl From<&super::User> for CurrentUser {
    fn from(user: &super::User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

/// Session keys.
pub mod keys {
    /// Logged-in storefront customer.
    pub const CURRENT_USER: &str = "current_user";

    /// Logged-in back-office user.
    pub const CURRENT_ADMIN: &str = "current_admin";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_first_name() {
        let user = CurrentUser {
            id: UserId::new(1),
            email: Email::parse("ana@example.com").unwrap(),
            name: "Ana María Pérez".to_owned(),
            role: UserRole::Customer,
        };
        assert_eq!(user.first_name(), "Ana");
        assert!(!user.is_admin());
    }

    #[test]
    fn test_role_defaults_to_customer_when_missing() {
        let json = r#"{"id":3,"email":"ana@example.com","name":"Ana"}"#;
        let user: CurrentUser = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, UserRole::Customer);
    }
}
