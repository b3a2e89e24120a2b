use axum::Json;
use serde::Serialize;

use crate::models::ApiResponse;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(
        "API is healthy",
        HealthStatus {
            status: "up",
            version: env!("CARGO_PKG_VERSION"),
        },
    ))
}
