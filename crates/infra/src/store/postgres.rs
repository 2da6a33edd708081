//! Postgres/PostGIS/pgRouting-backed map store.
//!
//! Every method issues a single statement on the shared pool. Identifiers in
//! the SQL text come from resolved schema types; values are bound.
//!
//! ## Thread Safety
//!
//! `PostgresMapStore` is `Send + Sync` and cheap to clone; the SQLx pool
//! handles connection management.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::QueryScalar;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use tracing::instrument;

use indoormap_core::{
    CachedRoute, CacheId, EdgeId, Heuristic, NodeId, PathStep, Record, RoomId, RouteRequest,
    RouteResult, VertexId,
};

use crate::config::DatabaseConfig;
use crate::error::{map_sqlx_error, StoreError, StoreResult};
use crate::schema::{EdgeTable, LayerColumns, NodeTable};
use crate::sql;

use super::r#trait::{DatabaseStatus, MapStore};

type PathStepRow = (i32, i32, i64, i64, f64, f64);
type CachedRouteRow = (i64, i64, i64, f64, f64, Json<Value>, DateTime<Utc>);
type RoomRouteRow = (Option<f64>, Option<String>);

#[derive(Debug, Clone)]
pub struct PostgresMapStore {
    pool: PgPool,
}

impl PostgresMapStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool sized and timed per `config`.
    #[instrument(skip(config), fields(max_connections = config.max_connections), err)]
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `route_cache` table when missing.
    #[instrument(skip(self), err)]
    pub async fn ensure_route_cache(&self) -> StoreResult<()> {
        sqlx::query(sql::CREATE_ROUTE_CACHE)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_route_cache", e))?;
        Ok(())
    }

    async fn fetch_records<'q>(
        &self,
        operation: &str,
        query: QueryScalar<'q, Postgres, Json<Record>, PgArguments>,
    ) -> StoreResult<Vec<Record>> {
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(rows.into_iter().map(|Json(r)| r).collect())
    }
}

fn path_step((seq, path_seq, node, edge, cost, agg_cost): PathStepRow) -> PathStep {
    PathStep {
        seq,
        path_seq,
        node: VertexId::new(node),
        edge: EdgeId::new(edge),
        cost,
        agg_cost,
    }
}

/// A missing row or NULL geometry means no route. A route without a
/// distance is a malformed result.
fn room_route(row: Option<RoomRouteRow>) -> StoreResult<Option<RouteResult>> {
    let Some((distance, Some(geojson))) = row else {
        return Ok(None);
    };
    let distance_meters = distance.ok_or_else(|| {
        StoreError::Decode("get_route_between_rooms returned a route without distance".to_string())
    })?;
    let route: Value = serde_json::from_str(&geojson)
        .map_err(|e| StoreError::Decode(format!("route geometry is not GeoJSON: {e}")))?;
    Ok(Some(RouteResult {
        distance_meters,
        route,
    }))
}

fn cached_route(
    (id, start, end, tolerance, distance, Json(route), created_at): CachedRouteRow,
) -> CachedRoute {
    CachedRoute {
        id: CacheId::new(id),
        start_room_id: RoomId::new(start),
        end_room_id: RoomId::new(end),
        simplify_tolerance: tolerance,
        distance_meters: distance,
        route,
        created_at,
    }
}

#[async_trait]
impl MapStore for PostgresMapStore {
    #[instrument(skip(self), err)]
    async fn table_columns(&self, table: &str) -> StoreResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(sql::TABLE_COLUMNS)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("table_columns", e))
    }

    #[instrument(skip(self, layer), fields(table = %layer.table), err)]
    async fn layer_records(&self, layer: &LayerColumns) -> StoreResult<Vec<Record>> {
        let text = sql::layer_records(layer);
        self.fetch_records("layer_records", sqlx::query_scalar(&text)).await
    }

    #[instrument(skip(self), err)]
    async fn installed_functions(&self, names: &[&str]) -> StoreResult<Vec<String>> {
        let wanted: Vec<String> = names.iter().map(|n| n.to_ascii_lowercase()).collect();
        sqlx::query_scalar::<_, String>(sql::INSTALLED_FUNCTIONS)
            .bind(wanted)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("installed_functions", e))
    }

    #[instrument(skip(self, edges), fields(table = %edges.table), err)]
    async fn create_topology(&self, edges: &EdgeTable, tolerance: f64) -> StoreResult<()> {
        let outcome = sqlx::query_scalar::<_, Option<String>>(sql::CREATE_TOPOLOGY)
            .bind(edges.table.as_str())
            .bind(tolerance)
            .bind(edges.geometry.as_str())
            .bind(edges.id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_topology", e))?;

        match outcome.as_deref() {
            Some("FAIL") => Err(StoreError::Query(format!(
                "pgr_createTopology failed on {}",
                edges.table
            ))),
            _ => Ok(()),
        }
    }

    #[instrument(skip(self, nodes), fields(table = %nodes.table, node = %node), err)]
    async fn node_geometry(&self, nodes: &NodeTable, node: NodeId) -> StoreResult<Option<String>> {
        let text = sql::node_geometry(nodes);
        let row = sqlx::query_scalar::<_, Option<String>>(&text)
            .bind(node.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("node_geometry", e))?;
        Ok(row.flatten())
    }

    #[instrument(skip(self, edges), fields(table = %edges.table), err)]
    async fn nearest_vertex(&self, edges: &EdgeTable, ewkt: &str) -> StoreResult<Option<VertexId>> {
        let text = sql::nearest_vertex(edges);
        let vid = sqlx::query_scalar::<_, i64>(&text)
            .bind(ewkt)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("nearest_vertex", e))?;
        Ok(vid.map(VertexId::new))
    }

    #[instrument(skip(self, edges), fields(table = %edges.table, from = %from, to = %to), err)]
    async fn dijkstra(
        &self,
        edges: &EdgeTable,
        from: VertexId,
        to: VertexId,
        directed: bool,
    ) -> StoreResult<Vec<PathStep>> {
        let rows = sqlx::query_as::<_, PathStepRow>(sql::DIJKSTRA)
            .bind(sql::edges_query(edges))
            .bind(from.get())
            .bind(to.get())
            .bind(directed)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("dijkstra", e))?;
        Ok(rows.into_iter().map(path_step).collect())
    }

    #[instrument(skip(self, edges), fields(table = %edges.table, from = %from, to = %to), err)]
    async fn astar(
        &self,
        edges: &EdgeTable,
        from: VertexId,
        to: VertexId,
        directed: bool,
        heuristic: Heuristic,
    ) -> StoreResult<Vec<PathStep>> {
        let rows = sqlx::query_as::<_, PathStepRow>(sql::ASTAR)
            .bind(sql::astar_edges_query(edges))
            .bind(from.get())
            .bind(to.get())
            .bind(directed)
            .bind(i32::from(heuristic.get()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("astar", e))?;
        Ok(rows.into_iter().map(path_step).collect())
    }

    #[instrument(skip(self, edges, ids), fields(table = %edges.table, count = ids.len()), err)]
    async fn edge_records(&self, edges: &EdgeTable, ids: &[EdgeId]) -> StoreResult<Vec<Record>> {
        let text = sql::edge_records(edges);
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        self.fetch_records("edge_records", sqlx::query_scalar(&text).bind(ids))
            .await
    }

    #[instrument(skip(self, edges), fields(table = %edges.table, from = %from), err)]
    async fn reachable_vertices(
        &self,
        edges: &EdgeTable,
        from: VertexId,
        max_cost: f64,
        directed: bool,
    ) -> StoreResult<Vec<Record>> {
        let text = sql::reachable_vertices(edges);
        let query = sqlx::query_scalar(&text)
            .bind(sql::edges_query(edges))
            .bind(from.get())
            .bind(directed)
            .bind(max_cost);
        self.fetch_records("reachable_vertices", query).await
    }

    #[instrument(skip(self), err)]
    async fn route_between_rooms(
        &self,
        request: &RouteRequest,
    ) -> StoreResult<Option<RouteResult>> {
        let row = sqlx::query_as::<_, RoomRouteRow>(sql::ROUTE_BETWEEN_ROOMS)
            .bind(request.start_room_id.get())
            .bind(request.end_room_id.get())
            .bind(request.simplify_tolerance)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("route_between_rooms", e))?;
        room_route(row)
    }

    #[instrument(skip(self, result), err)]
    async fn save_route(
        &self,
        request: &RouteRequest,
        result: &RouteResult,
    ) -> StoreResult<CachedRoute> {
        let row = sqlx::query_as::<_, CachedRouteRow>(sql::INSERT_ROUTE_CACHE)
            .bind(request.start_room_id.get())
            .bind(request.end_room_id.get())
            .bind(request.simplify_tolerance)
            .bind(result.distance_meters)
            .bind(Json(result.route.clone()))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("save_route", e))?;
        Ok(cached_route(row))
    }

    #[instrument(skip(self), fields(id = %id), err)]
    async fn cached_route(&self, id: CacheId) -> StoreResult<Option<CachedRoute>> {
        let row = sqlx::query_as::<_, CachedRouteRow>(sql::SELECT_ROUTE_CACHE)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("cached_route", e))?;
        Ok(row.map(cached_route))
    }

    #[instrument(skip(self), err)]
    async fn status(&self) -> StoreResult<DatabaseStatus> {
        let (postgis, pgrouting) =
            sqlx::query_as::<_, (Option<String>, Option<String>)>(sql::EXTENSION_VERSIONS)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("status", e))?;
        Ok(DatabaseStatus { postgis, pgrouting })
    }
}
