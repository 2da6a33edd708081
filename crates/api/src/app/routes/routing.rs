use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use indoormap_core::{AstarQuery, FeatureCollection, IsochroneQuery, PathQuery, ViaQuery};
use indoormap_infra::ServiceResult;

use crate::app::dto::{self, ErrorBody};
use crate::app::errors;
use crate::app::services::AppServices;

use super::route_both;

pub fn router() -> Router {
    let router = Router::new();
    let router = route_both(router, "/shortest_path", get(shortest_path));
    let router = route_both(router, "/astar", get(astar));
    let router = route_both(router, "/via_points", get(via_points));
    route_both(router, "/isochrone", get(isochrone))
}

fn respond(result: ServiceResult<FeatureCollection>) -> axum::response::Response {
    match result {
        Ok(fc) => Json(fc).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Shortest path between two nodes (`pgr_dijkstra`).
///
/// One feature per traversed edge, in path order.
#[utoipa::path(
    get,
    path = "/api/route/shortest_path/",
    tag = "routing",
    params(
        ("start" = i64, Query, description = "nav_nodes ogc_fid of the origin"),
        ("end" = i64, Query, description = "nav_nodes ogc_fid of the destination"),
        ("directed" = Option<bool>, Query, description = "respect edge direction, default false"),
    ),
    responses(
        (status = 200, description = "edges along the path", body = FeatureCollection),
        (status = 400, description = "missing or malformed parameters", body = ErrorBody),
        (status = 404, description = "unknown node or no route", body = ErrorBody),
        (status = 500, description = "pgRouting missing or database error", body = ErrorBody),
        (status = 503, description = "database unavailable", body = ErrorBody),
    )
)]
pub async fn shortest_path(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::PathParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(p) = match params {
        Ok(p) => p,
        Err(e) => return errors::bad_request(e.body_text()),
    };
    let query = match PathQuery::parse(
        p.start.as_deref(),
        p.end.as_deref(),
        p.directed.as_deref(),
    ) {
        Ok(q) => q,
        Err(e) => return errors::map_error_to_response(e),
    };
    respond(services.planner.shortest_path(query).await)
}

/// Shortest path between two nodes (`pgr_astar`).
#[utoipa::path(
    get,
    path = "/api/route/astar/",
    tag = "routing",
    params(
        ("start" = i64, Query, description = "nav_nodes ogc_fid of the origin"),
        ("end" = i64, Query, description = "nav_nodes ogc_fid of the destination"),
        ("directed" = Option<bool>, Query, description = "respect edge direction, default false"),
        ("heuristic" = Option<u8>, Query, description = "pgr_astar heuristic, 0 to 5, default 5"),
    ),
    responses(
        (status = 200, description = "edges along the path", body = FeatureCollection),
        (status = 400, description = "missing or malformed parameters", body = ErrorBody),
        (status = 404, description = "unknown node or no route", body = ErrorBody),
        (status = 500, description = "pgRouting missing or database error", body = ErrorBody),
        (status = 503, description = "database unavailable", body = ErrorBody),
    )
)]
pub async fn astar(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::AstarParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(p) = match params {
        Ok(p) => p,
        Err(e) => return errors::bad_request(e.body_text()),
    };
    let query = match AstarQuery::parse(
        p.start.as_deref(),
        p.end.as_deref(),
        p.directed.as_deref(),
        p.heuristic.as_deref(),
    ) {
        Ok(q) => q,
        Err(e) => return errors::map_error_to_response(e),
    };
    respond(services.planner.astar_path(query).await)
}

/// Route through an ordered list of nodes, one `pgr_dijkstra` leg at a time.
///
/// Every feature carries its 0-based `leg`; `agg_cost` accumulates across
/// legs.
#[utoipa::path(
    get,
    path = "/api/route/via_points/",
    tag = "routing",
    params(
        ("points" = String, Query, description = "comma-separated nav_nodes ogc_fid, at least two"),
        ("directed" = Option<bool>, Query, description = "respect edge direction, default false"),
    ),
    responses(
        (status = 200, description = "edges of every leg", body = FeatureCollection),
        (status = 400, description = "missing or malformed parameters", body = ErrorBody),
        (status = 404, description = "unknown node or a leg without route", body = ErrorBody),
        (status = 500, description = "pgRouting missing or database error", body = ErrorBody),
        (status = 503, description = "database unavailable", body = ErrorBody),
    )
)]
pub async fn via_points(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::ViaParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(p) = match params {
        Ok(p) => p,
        Err(e) => return errors::bad_request(e.body_text()),
    };
    let query = match ViaQuery::parse(p.points.as_deref(), p.directed.as_deref()) {
        Ok(q) => q,
        Err(e) => return errors::map_error_to_response(e),
    };
    respond(services.planner.via_points(query).await)
}

/// Vertices reachable from a node within a cost budget (`pgr_dijkstraCost`).
#[utoipa::path(
    get,
    path = "/api/route/isochrone/",
    tag = "routing",
    params(
        ("start" = i64, Query, description = "nav_nodes ogc_fid of the origin"),
        ("max_cost" = f64, Query, description = "cost budget, greater than 0"),
        ("directed" = Option<bool>, Query, description = "respect edge direction, default false"),
    ),
    responses(
        (status = 200, description = "reachable vertices by cost", body = FeatureCollection),
        (status = 400, description = "missing or malformed parameters", body = ErrorBody),
        (status = 404, description = "unknown node", body = ErrorBody),
        (status = 500, description = "pgRouting missing or database error", body = ErrorBody),
        (status = 503, description = "database unavailable", body = ErrorBody),
    )
)]
pub async fn isochrone(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<dto::IsochroneParams>, QueryRejection>,
) -> axum::response::Response {
    let Query(p) = match params {
        Ok(p) => p,
        Err(e) => return errors::bad_request(e.body_text()),
    };
    let query = match IsochroneQuery::parse(
        p.start.as_deref(),
        p.max_cost.as_deref(),
        p.directed.as_deref(),
    ) {
        Ok(q) => q,
        Err(e) => return errors::map_error_to_response(e),
    };
    respond(services.planner.isochrone(query).await)
}
