use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use indoormap_core::{CacheId, CachedRoute, PlannedRoute, RouteRequest};
use indoormap_infra::{BaseFloorItem, Room};

use crate::app::dto::ErrorBody;
use crate::app::errors;
use crate::app::services::AppServices;

use super::route_both;

pub fn router() -> Router {
    let router = Router::new();
    let router = route_both(router, "/rooms", get(list_rooms));
    let router = route_both(router, "/base-floor", get(base_floor));
    let router = route_both(router, "/route", post(plan_route));
    route_both(router, "/route/cache/:id", get(get_cached_route))
}

/// Rooms with their label and location.
#[utoipa::path(
    get,
    path = "/api/v1/rooms/",
    tag = "rooms",
    responses(
        (status = 200, description = "room list", body = Vec<Room>),
        (status = 500, description = "room_points missing or database error", body = ErrorBody),
        (status = 503, description = "database unavailable", body = ErrorBody),
    )
)]
pub async fn list_rooms(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.layers.rooms().await {
        Ok(rooms) => Json(rooms).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Base floor entities with decoded geometry.
#[utoipa::path(
    get,
    path = "/api/v1/base-floor/",
    tag = "rooms",
    responses(
        (status = 200, description = "base floor rows", body = Vec<BaseFloorItem>),
        (status = 500, description = "base_floor missing or database error", body = ErrorBody),
        (status = 503, description = "database unavailable", body = ErrorBody),
    )
)]
pub async fn base_floor(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.layers.base_floor_items().await {
        Ok(items) => Json(items).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Route between two rooms (`get_route_between_rooms`).
///
/// The result is saved to the route cache; `cache_id` is `null` when that
/// fails.
#[utoipa::path(
    post,
    path = "/api/v1/route/",
    tag = "rooms",
    request_body = RouteRequest,
    responses(
        (status = 200, description = "planned route", body = PlannedRoute),
        (status = 400, description = "malformed body or negative tolerance", body = ErrorBody),
        (status = 404, description = "no route found between rooms", body = ErrorBody),
        (status = 500, description = "stored function missing or database error", body = ErrorBody),
        (status = 503, description = "database unavailable", body = ErrorBody),
    )
)]
pub async fn plan_route(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<RouteRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(request) = match body {
        Ok(b) => b,
        Err(e) => return errors::bad_request(e.body_text()),
    };

    match services.planner.route_between_rooms(request).await {
        Ok(planned) => (StatusCode::OK, Json(planned)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// A previously planned route.
#[utoipa::path(
    get,
    path = "/api/v1/route/cache/{id}/",
    tag = "rooms",
    params(("id" = i64, Path, description = "route_cache id")),
    responses(
        (status = 200, description = "cached route", body = CachedRoute),
        (status = 400, description = "id is not an integer", body = ErrorBody),
        (status = 404, description = "cached route not found", body = ErrorBody),
        (status = 500, description = "database error", body = ErrorBody),
        (status = 503, description = "database unavailable", body = ErrorBody),
    )
)]
pub async fn get_cached_route(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CacheId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::map_error_to_response(e),
    };

    match services.planner.cached_route(id).await {
        Ok(cached) => Json(cached).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
