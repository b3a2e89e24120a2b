//! Data models shared across database access and API handlers.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Machine-readable failure attached to an error envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Envelope wrapped around every response body.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
    /// RFC 3339, UTC, second precision.
    pub timestamp: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: ResponseStatus::Success,
            message: message.into(),
            data: Some(data),
            error: None,
            timestamp: now_timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(
        message: impl Into<String>,
        code: impl Into<String>,
        description: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        Self {
            status: ResponseStatus::Error,
            message: message.into(),
            data: None,
            error: Some(ApiErrorBody {
                code: code.into(),
                description: description.into(),
                details,
            }),
            timestamp: now_timestamp(),
        }
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub mod auth;
pub mod session;
pub mod user;
