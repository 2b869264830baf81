use axum::Json;

use crate::models::HealthResponse;

pub mod auth;
pub mod restaurants;
pub mod users;

/// health
///
/// [Public Route] Liveness probe for load balancers and monitoring.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// Emails are compared and stored lower-cased and trimmed.
pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
