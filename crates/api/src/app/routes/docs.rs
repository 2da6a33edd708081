//! OpenAPI document generated from the handler annotations, plus the
//! Swagger UI and ReDoc viewers.

use axum::{routing::get, Json, Router};
use utoipa::openapi::content::ContentBuilder;
use utoipa::openapi::path::{HttpMethod, OperationBuilder, PathItem};
use utoipa::openapi::response::{Response, ResponseBuilder};
use utoipa::openapi::Ref;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

use indoormap_core::{
    CachedRoute, Feature, FeatureCollection, Layer, PlannedRoute, RouteRequest,
};
use indoormap_infra::{BaseFloorItem, DatabaseStatus, Room};

use crate::app::dto::{ErrorBody, HealthFailure, HealthResponse};

use super::{rooms, route_both, routing, system};

/// JSON document the Swagger UI loads.
pub const OPENAPI_JSON_URL: &str = "/api/docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Indoor map API",
        description = "GeoJSON layers and pgRouting routing over an indoor map database."
    ),
    paths(
        routing::shortest_path,
        routing::astar,
        routing::via_points,
        routing::isochrone,
        rooms::list_rooms,
        rooms::base_floor,
        rooms::plan_route,
        rooms::get_cached_route,
        system::health,
        v1_schema,
        docs_schema,
    ),
    components(schemas(
        Feature,
        FeatureCollection,
        ErrorBody,
        Room,
        BaseFloorItem,
        RouteRequest,
        PlannedRoute,
        CachedRoute,
        DatabaseStatus,
        HealthResponse,
        HealthFailure,
    )),
    tags(
        (name = "layers", description = "Raw map tables as GeoJSON"),
        (name = "routing", description = "pgRouting queries between navigation nodes"),
        (name = "rooms", description = "Rooms, base floor and room-to-room routes"),
        (name = "system", description = "Health and API description"),
    )
)]
struct ApiDoc;

/// The JSON document at both schema paths, Swagger UI at
/// `/api/docs/swagger/` and ReDoc at `/api/docs/redoc/`.
pub fn router() -> Router {
    let router = route_both(Router::new(), "/api/v1/schema", get(v1_schema));
    route_both(router, "/api/docs/schema", get(docs_schema))
        .merge(SwaggerUi::new("/api/docs/swagger").url(OPENAPI_JSON_URL, openapi()))
        .merge(Redoc::with_url("/api/docs/redoc", openapi()))
        .merge(Redoc::with_url("/api/docs/redoc/", openapi()))
}

/// The full document: annotated handlers plus one path per map layer.
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    for layer in Layer::ALL {
        doc.paths
            .paths
            .insert(format!("/api/{}/", layer.table()), layer_path(layer));
    }
    doc
}

/// This document.
#[utoipa::path(
    get,
    path = "/api/v1/schema/",
    tag = "system",
    responses((status = 200, description = "OpenAPI 3 document"))
)]
pub async fn v1_schema() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

/// This document, next to the viewers.
#[utoipa::path(
    get,
    path = "/api/docs/schema/",
    tag = "system",
    responses((status = 200, description = "OpenAPI 3 document"))
)]
pub async fn docs_schema() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
}

fn json_response(description: &str, schema: &str) -> Response {
    ResponseBuilder::new()
        .description(description)
        .content(
            "application/json",
            ContentBuilder::new()
                .schema(Some(Ref::from_schema_name(schema)))
                .build(),
        )
        .build()
}

// Layer handlers are built in a loop, so their paths are added here.
fn layer_path(layer: Layer) -> PathItem {
    let operation = OperationBuilder::new()
        .tag("layers")
        .summary(Some(format!("Every feature of the `{}` table", layer.table())))
        .operation_id(Some(format!("layer_{}", layer.table())))
        .response("200", json_response("GeoJSON FeatureCollection", "FeatureCollection"))
        .response(
            "500",
            json_response("table or geometry column missing, or database error", "ErrorBody"),
        )
        .response("503", json_response("database unavailable", "ErrorBody"));
    PathItem::new(HttpMethod::Get, operation)
}
