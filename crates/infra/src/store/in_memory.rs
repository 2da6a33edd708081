use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use indoormap_core::{
    CachedRoute, CacheId, EdgeId, Heuristic, NodeId, PathStep, Record, RoomId, RouteRequest,
    RouteResult, VertexId,
};

use crate::error::{StoreError, StoreResult};
use crate::schema::{EdgeTable, LayerColumns, NodeTable};
use crate::sql::{EDGE_ID_KEY, GEOJSON_KEY};

use super::r#trait::{DatabaseStatus, MapStore};

#[derive(Debug, Clone, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

/// Fixture-backed map store.
///
/// Intended for tests/dev. Tables hold rows whose geometry column carries
/// GeoJSON text; graph queries answer from canned results keyed by vertex.
#[derive(Debug)]
pub struct InMemoryMapStore {
    tables: RwLock<HashMap<String, Table>>,
    functions: Vec<String>,
    node_geometry: HashMap<i64, String>,
    vertices: HashMap<String, VertexId>,
    paths: HashMap<(VertexId, VertexId), Vec<PathStep>>,
    reachable: HashMap<VertexId, Vec<(VertexId, f64)>>,
    room_routes: HashMap<(RoomId, RoomId), RouteResult>,
    status: DatabaseStatus,
    cache: RwLock<Vec<CachedRoute>>,
    topology_runs: AtomicUsize,
    unavailable: AtomicBool,
}

impl Default for InMemoryMapStore {
    fn default() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            functions: [
                "pgr_dijkstra",
                "pgr_astar",
                "pgr_dijkstracost",
                "pgr_createtopology",
                "get_route_between_rooms",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            node_geometry: HashMap::new(),
            vertices: HashMap::new(),
            paths: HashMap::new(),
            reachable: HashMap::new(),
            room_routes: HashMap::new(),
            status: DatabaseStatus {
                postgis: Some("3.4.2".into()),
                pgrouting: Some("3.6.1".into()),
            },
            cache: RwLock::new(Vec::new()),
            topology_runs: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
        }
    }
}

fn point_ewkt(x: f64, y: f64) -> String {
    format!("SRID=3857;POINT({x} {y})")
}

fn point_geojson(x: f64, y: f64) -> String {
    json!({ "type": "Point", "coordinates": [x, y] }).to_string()
}

fn line_geojson(from: (f64, f64), to: (f64, f64)) -> String {
    json!({ "type": "LineString", "coordinates": [[from.0, from.1], [to.0, to.1]] }).to_string()
}

fn row(pairs: Vec<(&str, Value)>) -> Record {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn lock_poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

impl InMemoryMapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small floor: three rooms, a corridor and a four-vertex graph
    /// (`10 - 20 - 30`, plus an isolated `40`).
    ///
    /// Nodes `1..=4` snap to vertices `10, 20, 30, 40`. Paths exist
    /// `10 -> 30` (edges 100, 101), `30 -> 20` (edge 101) and `10 -> 20`
    /// (edge 100). Rooms `1 -> 2` have a stored route.
    pub fn sample() -> Self {
        let cad = [
            "ogc_fid",
            "layer",
            "paperspace",
            "subclasses",
            "linetype",
            "entityhandle",
            "text",
            "wkb_geometry",
        ];
        let nodes = ["ogc_fid", "fid", "node_type", "wkb_geometry"];
        let edges = ["ogc_fid", "fid", "source", "target", "cost", "reverse_cost", "wkb_geometry"];

        let cad_row = |fid: i64, layer: &str, text: Option<&str>, geom: String| {
            row(vec![
                ("ogc_fid", json!(fid)),
                ("layer", json!(layer)),
                ("paperspace", json!(false)),
                ("subclasses", json!("AcDbEntity:AcDbLine")),
                ("linetype", Value::Null),
                ("entityhandle", json!(format!("{fid:X}"))),
                ("text", text.map_or(Value::Null, |t| json!(t))),
                ("wkb_geometry", json!(geom)),
            ])
        };

        let edge_row = |fid: i64,
                        source: i64,
                        target: i64,
                        cost: f64,
                        from: (f64, f64),
                        to: (f64, f64)| {
            row(vec![
                ("ogc_fid", json!(fid)),
                ("fid", json!(fid)),
                ("source", json!(source)),
                ("target", json!(target)),
                ("cost", json!(cost)),
                ("reverse_cost", json!(cost)),
                ("wkb_geometry", json!(line_geojson(from, to))),
            ])
        };

        let step = |seq: i32, node: i64, edge: i64, cost: f64, agg_cost: f64| PathStep {
            seq,
            path_seq: seq,
            node: VertexId::new(node),
            edge: EdgeId::new(edge),
            cost,
            agg_cost,
        };

        Self::new()
            .with_table(
                "base_floor",
                &cad,
                vec![
                    cad_row(1, "WALLS", None, line_geojson((0.0, 0.0), (20.0, 0.0))),
                    cad_row(2, "WALLS", None, line_geojson((20.0, 0.0), (20.0, 10.0))),
                    cad_row(3, "DOORS", Some("D1"), point_geojson(5.0, 0.0)),
                ],
            )
            .with_table(
                "corridors",
                &cad,
                vec![cad_row(1, "CORRIDOR", None, line_geojson((0.0, 5.0), (20.0, 5.0)))],
            )
            .with_table(
                "room_points",
                &cad,
                vec![
                    cad_row(1, "ROOMS", Some("Lab 101"), point_geojson(0.0, 0.0)),
                    cad_row(2, "ROOMS", Some("Lab 102"), point_geojson(20.0, 0.0)),
                    cad_row(3, "ROOMS", None, point_geojson(10.0, 10.0)),
                ],
            )
            .with_table(
                "nav_nodes",
                &nodes,
                (1..=4)
                    .map(|i| {
                        row(vec![
                            ("ogc_fid", json!(i)),
                            ("fid", json!(i)),
                            ("node_type", json!("corridor")),
                            ("wkb_geometry", json!(point_geojson(i as f64 * 10.0, 0.0))),
                        ])
                    })
                    .collect(),
            )
            .with_table(
                "nav_edges_final",
                &edges,
                vec![
                    edge_row(100, 10, 20, 10.0, (10.0, 0.0), (20.0, 0.0)),
                    edge_row(101, 20, 30, 12.5, (20.0, 0.0), (30.0, 0.0)),
                ],
            )
            .with_node(NodeId::new(1), VertexId::new(10))
            .with_node(NodeId::new(2), VertexId::new(20))
            .with_node(NodeId::new(3), VertexId::new(30))
            .with_node(NodeId::new(4), VertexId::new(40))
            .with_path(
                VertexId::new(10),
                VertexId::new(30),
                vec![
                    step(1, 10, 100, 10.0, 0.0),
                    step(2, 20, 101, 12.5, 10.0),
                    step(3, 30, -1, 0.0, 22.5),
                ],
            )
            .with_path(
                VertexId::new(30),
                VertexId::new(20),
                vec![step(1, 30, 101, 12.5, 0.0), step(2, 20, -1, 0.0, 12.5)],
            )
            .with_path(
                VertexId::new(10),
                VertexId::new(20),
                vec![step(1, 10, 100, 10.0, 0.0), step(2, 20, -1, 0.0, 10.0)],
            )
            .with_reachable(
                VertexId::new(10),
                vec![(VertexId::new(20), 10.0), (VertexId::new(30), 22.5)],
            )
            .with_room_route(
                RoomId::new(1),
                RoomId::new(2),
                RouteResult {
                    distance_meters: 22.5,
                    route: json!({
                        "type": "LineString",
                        "coordinates": [[0.0, 0.0], [10.0, 0.0], [20.0, 0.0]]
                    }),
                },
            )
    }

    /// Add or replace a table. Rows should carry a geometry column with
    /// GeoJSON text.
    pub fn with_table(mut self, name: &str, columns: &[&str], rows: Vec<Record>) -> Self {
        let table = Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        };
        self.tables
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), table);
        self
    }

    /// Remove a column from a table (e.g. drop `source`/`target` to force a
    /// topology build).
    pub fn without_column(mut self, table: &str, column: &str) -> Self {
        if let Some(t) = self
            .tables
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(table)
        {
            t.columns.retain(|c| c != column);
        }
        self
    }

    /// Replace the set of functions reported by `pg_proc`.
    pub fn with_functions(mut self, names: &[&str]) -> Self {
        self.functions = names.iter().map(|n| n.to_ascii_lowercase()).collect();
        self
    }

    /// A navigation node snapping to `vertex`.
    pub fn with_node(mut self, node: NodeId, vertex: VertexId) -> Self {
        let ewkt = point_ewkt(node.get() as f64 * 10.0, 0.0);
        self.vertices.insert(ewkt.clone(), vertex);
        self.node_geometry.insert(node.get(), ewkt);
        self
    }

    /// A navigation node with no graph vertex nearby.
    pub fn with_unsnappable_node(mut self, node: NodeId) -> Self {
        self.node_geometry
            .insert(node.get(), point_ewkt(-1.0, node.get() as f64));
        self
    }

    pub fn with_path(mut self, from: VertexId, to: VertexId, steps: Vec<PathStep>) -> Self {
        self.paths.insert((from, to), steps);
        self
    }

    /// Vertices reachable from `from` with their aggregate cost.
    pub fn with_reachable(mut self, from: VertexId, reachable: Vec<(VertexId, f64)>) -> Self {
        self.reachable.insert(from, reachable);
        self
    }

    pub fn with_room_route(mut self, start: RoomId, end: RoomId, route: RouteResult) -> Self {
        self.room_routes.insert((start, end), route);
        self
    }

    pub fn with_status(mut self, status: DatabaseStatus) -> Self {
        self.status = status;
        self
    }

    /// Make every call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `create_topology` calls so far.
    pub fn topology_runs(&self) -> usize {
        self.topology_runs.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store marked unavailable".to_string()));
        }
        Ok(())
    }

    fn table(&self, name: &str) -> StoreResult<Option<Table>> {
        let tables = self.tables.read().map_err(lock_poisoned)?;
        Ok(tables.get(name).cloned())
    }
}

fn geometry_text(row: &Record, column: &str) -> Value {
    match row.get(column) {
        Some(Value::String(s)) => Value::String(s.clone()),
        Some(Value::Object(o)) => Value::String(Value::Object(o.clone()).to_string()),
        _ => Value::Null,
    }
}

fn vertex_point(vertex: VertexId) -> Value {
    Value::String(point_geojson(vertex.get() as f64, 0.0))
}

#[async_trait]
impl MapStore for InMemoryMapStore {
    async fn table_columns(&self, table: &str) -> StoreResult<Vec<String>> {
        self.check_available()?;
        Ok(self.table(table)?.map(|t| t.columns).unwrap_or_default())
    }

    async fn layer_records(&self, layer: &LayerColumns) -> StoreResult<Vec<Record>> {
        self.check_available()?;
        let Some(table) = self.table(layer.table.as_str())? else {
            return Err(StoreError::Query(format!("relation \"{}\" does not exist", layer.table)));
        };

        Ok(table
            .rows
            .iter()
            .map(|r| {
                let mut out: Record = layer
                    .properties
                    .iter()
                    .map(|p| (p.to_string(), r.get(p.as_str()).cloned().unwrap_or(Value::Null)))
                    .collect();
                out.insert(GEOJSON_KEY.to_string(), geometry_text(r, layer.geometry.as_str()));
                out
            })
            .collect())
    }

    async fn installed_functions(&self, names: &[&str]) -> StoreResult<Vec<String>> {
        self.check_available()?;
        Ok(names
            .iter()
            .map(|n| n.to_ascii_lowercase())
            .filter(|n| self.functions.contains(n))
            .collect())
    }

    async fn create_topology(&self, edges: &EdgeTable, _tolerance: f64) -> StoreResult<()> {
        self.check_available()?;
        self.topology_runs.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.write().map_err(lock_poisoned)?;
        let table = tables
            .get_mut(edges.table.as_str())
            .ok_or_else(|| {
                StoreError::Query(format!("relation \"{}\" does not exist", edges.table))
            })?;
        for col in ["source", "target"] {
            if !table.columns.iter().any(|c| c == col) {
                table.columns.push(col.to_string());
            }
        }
        Ok(())
    }

    async fn node_geometry(&self, _nodes: &NodeTable, node: NodeId) -> StoreResult<Option<String>> {
        self.check_available()?;
        Ok(self.node_geometry.get(&node.get()).cloned())
    }

    async fn nearest_vertex(
        &self,
        _edges: &EdgeTable,
        ewkt: &str,
    ) -> StoreResult<Option<VertexId>> {
        self.check_available()?;
        Ok(self.vertices.get(ewkt).copied())
    }

    async fn dijkstra(
        &self,
        _edges: &EdgeTable,
        from: VertexId,
        to: VertexId,
        _directed: bool,
    ) -> StoreResult<Vec<PathStep>> {
        self.check_available()?;
        Ok(self.paths.get(&(from, to)).cloned().unwrap_or_default())
    }

    async fn astar(
        &self,
        edges: &EdgeTable,
        from: VertexId,
        to: VertexId,
        directed: bool,
        _heuristic: Heuristic,
    ) -> StoreResult<Vec<PathStep>> {
        self.dijkstra(edges, from, to, directed).await
    }

    async fn edge_records(&self, edges: &EdgeTable, ids: &[EdgeId]) -> StoreResult<Vec<Record>> {
        self.check_available()?;
        let Some(table) = self.table(edges.table.as_str())? else {
            return Ok(Vec::new());
        };

        Ok(table
            .rows
            .iter()
            .filter_map(|r| {
                let id = r.get(edges.id.as_str()).and_then(Value::as_i64)?;
                if !ids.iter().any(|e| e.get() == id) {
                    return None;
                }
                let mut out = Record::new();
                out.insert(EDGE_ID_KEY.to_string(), json!(id));
                for p in &edges.properties {
                    out.insert(p.to_string(), r.get(p.as_str()).cloned().unwrap_or(Value::Null));
                }
                out.insert(GEOJSON_KEY.to_string(), geometry_text(r, edges.geometry.as_str()));
                Some(out)
            })
            .collect())
    }

    async fn reachable_vertices(
        &self,
        _edges: &EdgeTable,
        from: VertexId,
        max_cost: f64,
        _directed: bool,
    ) -> StoreResult<Vec<Record>> {
        self.check_available()?;
        let mut reach: Vec<(VertexId, f64)> = vec![(from, 0.0)];
        reach.extend(
            self.reachable
                .get(&from)
                .into_iter()
                .flatten()
                .filter(|(v, cost)| *v != from && *cost <= max_cost)
                .copied(),
        );
        reach.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.get().cmp(&b.0.get())));

        Ok(reach
            .into_iter()
            .map(|(v, cost)| {
                row(vec![
                    ("vertex_id", json!(v.get())),
                    ("agg_cost", json!(cost)),
                    (GEOJSON_KEY, vertex_point(v)),
                ])
            })
            .collect())
    }

    async fn route_between_rooms(
        &self,
        request: &RouteRequest,
    ) -> StoreResult<Option<RouteResult>> {
        self.check_available()?;
        Ok(self
            .room_routes
            .get(&(request.start_room_id, request.end_room_id))
            .cloned())
    }

    async fn save_route(
        &self,
        request: &RouteRequest,
        result: &RouteResult,
    ) -> StoreResult<CachedRoute> {
        self.check_available()?;
        let mut cache = self.cache.write().map_err(lock_poisoned)?;
        let saved = CachedRoute {
            id: CacheId::new(cache.len() as i64 + 1),
            start_room_id: request.start_room_id,
            end_room_id: request.end_room_id,
            simplify_tolerance: request.simplify_tolerance,
            distance_meters: result.distance_meters,
            route: result.route.clone(),
            created_at: Utc::now(),
        };
        cache.push(saved.clone());
        Ok(saved)
    }

    async fn cached_route(&self, id: CacheId) -> StoreResult<Option<CachedRoute>> {
        self.check_available()?;
        let cache = self.cache.read().map_err(lock_poisoned)?;
        Ok(cache.iter().find(|c| c.id == id).cloned())
    }

    async fn status(&self) -> StoreResult<DatabaseStatus> {
        self.check_available()?;
        Ok(self.status.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{resolve_edge_table, resolve_layer};

    async fn edges(store: &InMemoryMapStore) -> EdgeTable {
        let cols = store.table_columns("nav_edges_final").await.unwrap();
        resolve_edge_table("nav_edges_final", &cols).unwrap()
    }

    #[tokio::test]
    async fn layer_records_project_properties_and_geojson() {
        let store = InMemoryMapStore::sample();
        let cols = store.table_columns("room_points").await.unwrap();
        let layer = resolve_layer("room_points", &["ogc_fid", "text"], &cols).unwrap();

        let rows = store.layer_records(&layer).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[0]["text"], json!("Lab 101"));
        assert!(rows[0][GEOJSON_KEY].as_str().unwrap().contains("Point"));
    }

    #[tokio::test]
    async fn unknown_table_has_no_columns() {
        let store = InMemoryMapStore::new();
        assert!(store.table_columns("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn topology_adds_source_and_target() {
        let store = InMemoryMapStore::sample()
            .without_column("nav_edges_final", "source")
            .without_column("nav_edges_final", "target");
        let table = edges(&store).await;
        assert!(!table.has_topology);

        store.create_topology(&table, 0.00001).await.unwrap();
        assert_eq!(store.topology_runs(), 1);
        assert!(edges(&store).await.has_topology);
    }

    #[tokio::test]
    async fn edge_records_filter_by_id() {
        let store = InMemoryMapStore::sample();
        let table = edges(&store).await;
        let rows = store.edge_records(&table, &[EdgeId::new(101), EdgeId::new(999)]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][EDGE_ID_KEY], json!(101));
        assert_eq!(rows[0]["target"], json!(30));
    }

    #[tokio::test]
    async fn reachable_includes_start_and_respects_budget() {
        let store = InMemoryMapStore::sample();
        let table = edges(&store).await;
        let rows = store
            .reachable_vertices(&table, VertexId::new(10), 15.0, false)
            .await
            .unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r["vertex_id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![10, 20]);
    }

    #[tokio::test]
    async fn cache_assigns_sequential_ids() {
        let store = InMemoryMapStore::new();
        let req = RouteRequest {
            start_room_id: RoomId::new(1),
            end_room_id: RoomId::new(2),
            simplify_tolerance: 0.0,
        };
        let result = RouteResult {
            distance_meters: 3.0,
            route: json!({"type": "LineString", "coordinates": []}),
        };
        let first = store.save_route(&req, &result).await.unwrap();
        let second = store.save_route(&req, &result).await.unwrap();
        assert_eq!(first.id, CacheId::new(1));
        assert_eq!(second.id, CacheId::new(2));
        assert_eq!(store.cached_route(CacheId::new(2)).await.unwrap(), Some(second));
        assert!(store.cached_route(CacheId::new(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unavailable_fails_every_call() {
        let store = InMemoryMapStore::sample();
        store.set_unavailable(true);
        assert!(matches!(store.status().await, Err(StoreError::Unavailable(_))));
        assert!(matches!(store.table_columns("base_floor").await, Err(StoreError::Unavailable(_))));
        store.set_unavailable(false);
        assert!(store.status().await.is_ok());
    }
}
