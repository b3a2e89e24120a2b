//! Unified validation framework for request payloads.
//!
//! Handlers take [`ValidatedJson<T>`] instead of `Json<T>`: body syntax and shape problems become
//! `invalid_request`, rule failures become `validation_failed` with per-field codes.

pub mod rules;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
pub use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                tracing::debug!(error = %rejection.body_text(), "Rejected request body");
                AppError::BadRequest("Invalid request body".to_string())
            })?;
        value.validate()?;
        Ok(Self(value))
    }
}
