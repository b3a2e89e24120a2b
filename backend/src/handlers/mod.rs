pub mod auth;
pub mod health;

use crate::error::AppError;

/// Fallback for unknown routes, so they answer with the same envelope as everything else.
pub async fn not_found() -> AppError {
    AppError::NotFound("The requested resource does not exist".to_string())
}
