//! Request and response bodies of the `/auth` endpoints.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{types::UserId, validation::rules};

#[derive(Clone, Deserialize, Validate)]
/// Payload for creating a new account.
pub struct RegisterRequest {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 8, max = 72))]
    pub password: String,
    #[validate(
        length(min = 2, max = 255),
        custom(function = "rules::validate_not_blank")
    )]
    pub full_name: String,
    #[validate(custom(function = "rules::validate_date_of_birth"))]
    pub date_of_birth: String,
}

impl RegisterRequest {
    /// Calendar date of birth; `None` only when the payload skipped validation.
    pub fn parsed_date_of_birth(&self) -> Option<NaiveDate> {
        rules::parse_date(&self.date_of_birth)
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("date_of_birth", &self.date_of_birth)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: UserId,
}

#[derive(Clone, Deserialize, Validate)]
/// Payload for authenticating with an email and password.
pub struct LoginRequest {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 8, max = 72))]
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
/// Body returned after a successful login. The session token only travels in its cookie.
pub struct LoginResponse {
    pub access_token: String,
    /// Seconds until the access token expires.
    pub expires_in: i64,
    pub token_type: String,
}

impl LoginResponse {
    pub fn bearer(access_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            expires_in,
            token_type: "Bearer".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
    /// Unix timestamp (seconds).
    pub expires_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutAllResponse {
    pub success: bool,
    pub message: String,
    pub sessions_ended: u64,
}
