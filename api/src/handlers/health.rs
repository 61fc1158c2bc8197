use axum::{extract::State, Json};
use chrono::Utc;
use tracing::debug;

use crate::{models::HealthResponse, AppState};

/// Health check endpoint
///
/// GET /api/v1/health
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("Health check requested");

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        auth_enabled: state.authorizer.is_enabled(),
        timestamp: Utc::now(),
    })
}
