use actix_web::{get, web};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::ApiResponse;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Liveness probe. Reachable without a session token.
#[get("/health")]
pub async fn health() -> web::Json<ApiResponse<HealthStatus>> {
    web::Json(ApiResponse::ok(HealthStatus {
        status: "healthy",
        timestamp: Utc::now(),
    }))
}
