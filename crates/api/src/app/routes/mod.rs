use axum::http::StatusCode;
use axum::routing::MethodRouter;
use axum::Router;

use crate::app::errors;

pub mod docs;
pub mod layers;
pub mod rooms;
pub mod routing;
pub mod system;

/// Every endpoint. Paths are served with and without the trailing slash.
pub fn router() -> Router {
    Router::new()
        .nest("/api", layers::router())
        .nest("/api/route", routing::router())
        .nest("/api/v1", rooms::router().merge(system::router()))
        .merge(docs::router())
}

/// Register `method` at `path` and at `path/`.
pub(crate) fn route_both(router: Router, path: &str, method: MethodRouter) -> Router {
    let bare = path.trim_end_matches('/');
    router
        .route(bare, method.clone())
        .route(&format!("{bare}/"), method)
}

pub async fn not_found() -> axum::response::Response {
    errors::json_error(StatusCode::NOT_FOUND, "not_found", "no such endpoint")
}
