use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::dto::{HealthFailure, HealthResponse};
use crate::app::errors;
use crate::app::services::AppServices;

use super::route_both;

pub fn router() -> Router {
    route_both(Router::new(), "/health", get(health))
}

/// Database health.
///
/// 200 with the PostGIS and pgRouting versions when the database answers,
/// 503 otherwise.
#[utoipa::path(
    get,
    path = "/api/v1/health/",
    tag = "system",
    responses(
        (status = 200, description = "database reachable", body = HealthResponse),
        (status = 503, description = "database unreachable", body = HealthFailure),
    )
)]
pub async fn health(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.store.status().await {
        Ok(extensions) => Json(HealthResponse {
            status: "ok",
            database: "ok",
            extensions,
        })
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            let body = HealthFailure {
                status: "unavailable",
                database: "unreachable",
                error: errors::error_body("database_unavailable", "database unavailable"),
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}
