use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use indoormap_core::{
    CachedRoute, CacheId, EdgeId, Heuristic, NodeId, PathStep, Record, RouteRequest, RouteResult,
    VertexId,
};

use crate::error::StoreResult;
use crate::schema::{EdgeTable, LayerColumns, NodeTable};

/// Versions of the spatial extensions, as reported by `pg_extension`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DatabaseStatus {
    pub postgis: Option<String>,
    pub pgrouting: Option<String>,
}

/// Database boundary of the map service.
///
/// Each method corresponds to one SQL statement; graph search, topology
/// building and snapping all run inside PostGIS/pgRouting. Orchestration
/// (ordering, error policy, GeoJSON shaping) lives in the services.
///
/// Row-shaped results come back as [`Record`]s whose geometry is GeoJSON
/// text under [`crate::sql::GEOJSON_KEY`].
#[async_trait]
pub trait MapStore: Send + Sync {
    /// Column names of `table`, in ordinal order. Empty when the table does
    /// not exist.
    async fn table_columns(&self, table: &str) -> StoreResult<Vec<String>>;

    /// Every row of a layer.
    async fn layer_records(&self, layer: &LayerColumns) -> StoreResult<Vec<Record>>;

    /// Which of `names` (lowercase) exist in `pg_proc`.
    async fn installed_functions(&self, names: &[&str]) -> StoreResult<Vec<String>>;

    /// Run `pgr_createTopology` on the edge table.
    async fn create_topology(&self, edges: &EdgeTable, tolerance: f64) -> StoreResult<()>;

    /// EWKT of a navigation node, `None` when the node does not exist.
    async fn node_geometry(&self, nodes: &NodeTable, node: NodeId) -> StoreResult<Option<String>>;

    /// Graph vertex closest to an EWKT point.
    async fn nearest_vertex(&self, edges: &EdgeTable, ewkt: &str) -> StoreResult<Option<VertexId>>;

    /// `pgr_dijkstra` rows, in path order. Empty when unreachable.
    async fn dijkstra(
        &self,
        edges: &EdgeTable,
        from: VertexId,
        to: VertexId,
        directed: bool,
    ) -> StoreResult<Vec<PathStep>>;

    /// `pgr_astar` rows, in path order. Empty when unreachable.
    async fn astar(
        &self,
        edges: &EdgeTable,
        from: VertexId,
        to: VertexId,
        directed: bool,
        heuristic: Heuristic,
    ) -> StoreResult<Vec<PathStep>>;

    /// Edge rows for the given ids, in no particular order.
    async fn edge_records(&self, edges: &EdgeTable, ids: &[EdgeId]) -> StoreResult<Vec<Record>>;

    /// Vertices reachable from `from` within `max_cost` (`pgr_dijkstraCost`),
    /// ordered by cost. Includes `from` itself.
    async fn reachable_vertices(
        &self,
        edges: &EdgeTable,
        from: VertexId,
        max_cost: f64,
        directed: bool,
    ) -> StoreResult<Vec<Record>>;

    /// Call `get_route_between_rooms`; `None` when no route exists.
    async fn route_between_rooms(
        &self,
        request: &RouteRequest,
    ) -> StoreResult<Option<RouteResult>>;

    async fn save_route(
        &self,
        request: &RouteRequest,
        result: &RouteResult,
    ) -> StoreResult<CachedRoute>;

    async fn cached_route(&self, id: CacheId) -> StoreResult<Option<CachedRoute>>;

    /// Round-trip to the database and report extension versions.
    async fn status(&self) -> StoreResult<DatabaseStatus>;
}
