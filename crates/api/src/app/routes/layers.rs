use std::sync::Arc;

use axum::{extract::Extension, routing::get, Json, Router};
use axum::response::IntoResponse;

use indoormap_core::Layer;

use crate::app::errors;
use crate::app::services::AppServices;

use super::route_both;

/// `GET /<table>/` for every map layer.
pub fn router() -> Router {
    Layer::ALL.into_iter().fold(Router::new(), |router, layer| {
        let handler = move |Extension(services): Extension<Arc<AppServices>>| {
            layer_features(services, layer)
        };
        route_both(router, &format!("/{}", layer.table()), get(handler))
    })
}

pub async fn layer_features(services: Arc<AppServices>, layer: Layer) -> axum::response::Response {
    match services.layers.feature_collection(layer).await {
        Ok(fc) => Json(fc).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
