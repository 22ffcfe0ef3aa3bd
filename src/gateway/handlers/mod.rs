//! HTTP handlers, grouped the way the API surface is.

pub mod auth;
pub mod balance;
pub mod orders;

use axum::Json;
use utoipa::OpenApi;

/// Liveness probe.
///
/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up")),
    tag = "ops"
)]
pub async fn health() -> &'static str {
    "OK"
}

/// Generated OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(super::openapi::ApiDoc::openapi())
}
