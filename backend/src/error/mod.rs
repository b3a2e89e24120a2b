use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

use crate::{
    models::ApiResponse,
    repositories::StoreError,
    services::AuthError,
    utils::{PasswordError, TokenError},
};

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const INVALID_TOKEN: &str = "Invalid or expired token";
pub const INVALID_SESSION: &str = "Invalid or expired session";

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// Per-field rule failures: `{field: [code, ...]}`.
    Validation(Value),
    Unauthorized(String),
    NotFound(String),
    Conflict {
        description: String,
        details: Option<Value>,
    },
    InternalServerError(anyhow::Error),
}

impl AppError {
    pub fn email_taken() -> Self {
        AppError::Conflict {
            description: "User with this email already exists".to_string(),
            details: Some(json!({ "email": "Email already exists" })),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, code, description, details) = match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "Invalid request data",
                "invalid_request",
                msg,
                None,
            ),
            AppError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                "Validation failed",
                "validation_failed",
                "One or more fields are invalid".to_string(),
                Some(details),
            ),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                "unauthorized",
                msg,
                None,
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "Not found",
                "resource_not_found",
                msg,
                None,
            ),
            AppError::Conflict {
                description,
                details,
            } => (
                StatusCode::CONFLICT,
                "Conflict",
                "duplicate_entry",
                description,
                details,
            ),
            AppError::InternalServerError(err) => {
                tracing::error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error",
                    "internal_error",
                    "An unexpected error occurred while processing your request".to_string(),
                    None,
                )
            }
        };

        let body = Json(ApiResponse::error(message, code, description, details));
        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalServerError(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalServerError(err.into())
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid | TokenError::Expired => {
                AppError::Unauthorized(INVALID_TOKEN.to_string())
            }
            TokenError::MissingSigningKey | TokenError::Signing(_) => {
                AppError::InternalServerError(err.into())
            }
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::InternalServerError(err.into())
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Unauthorized(INVALID_CREDENTIALS.to_string()),
            AuthError::InvalidSession => AppError::Unauthorized(INVALID_SESSION.to_string()),
            AuthError::EmailTaken => AppError::email_taken(),
            AuthError::Token(err) => err.into(),
            AuthError::Store(err) => err.into(),
            AuthError::Password(err) => err.into(),
            AuthError::Task(err) => AppError::InternalServerError(err.into()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details: Map<String, Value> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let codes = errs
                    .iter()
                    .map(|e| Value::String(e.code.to_string()))
                    .collect();
                (field.to_string(), Value::Array(codes))
            })
            .collect();
        AppError::Validation(Value::Object(details))
    }
}
