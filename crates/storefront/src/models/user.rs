//! Registered users.

use chrono::{DateTime, Utc};

use vivero_core::{Email, UserId, UserRole};

/// A registered user (customer or admin).
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin user-list filter.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Matches name or email.
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub page: u32,
}

/// Profile fields a customer can change on their own.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: Option<String>,
}
