//! Root health check and unknown-route fallback.

use axum::Json;
use axum::http::Uri;
use chrono::Utc;

use crate::error::AppError;
use crate::models::HealthResponse;

/// `GET /`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        message: "Welcome to the Estate API".into(),
        status: "Server is running successfully".into(),
        timestamp: Utc::now(),
    })
}

/// Fallback for unmatched routes.
pub async fn not_found_handler(uri: Uri) -> AppError {
    AppError::NotFound(format!(
        "The requested endpoint {} does not exist",
        uri.path()
    ))
}
