//! Models that represent user accounts and their public projections.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::types::UserId;

#[derive(Clone, FromRow)]
/// Database representation of a registered user account.
pub struct User {
    /// Unique identifier for the user.
    pub id: UserId,
    /// Normalised (trimmed, lower-cased) login email.
    pub email: String,
    /// Argon2id PHC credential string.
    pub password_hash: String,
    /// Human-readable full name, used as the display name in access tokens.
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub email_verified: bool,
    /// Disabled accounts cannot log in or refresh.
    pub is_active: bool,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("email_verified", &self.email_verified)
            .field("is_active", &self.is_active)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Roles stored with each account. The auth core only records them.
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

/// Insert payload for a new account; the password is already hashed.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

impl User {
    /// Builds the row a store persists for `new`, with defaults for a fresh account.
    pub fn from_new(new: NewUser) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email: new.email,
            password_hash: new.password_hash,
            full_name: new.full_name,
            date_of_birth: new.date_of_birth,
            email_verified: false,
            is_active: true,
            role: UserRole::User,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Canonical form used for storage and lookup of login emails.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
