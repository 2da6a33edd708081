//! Route planning on top of pgRouting.
//!
//! The planner never searches the graph itself. It prepares the routing
//! tables (function check, topology, node snapping), delegates the search to
//! a single pgRouting call per leg and shapes the result as GeoJSON.
//!
//! ## Error Mapping
//!
//! | Situation | ServiceError |
//! |-----------|--------------|
//! | pgRouting / stored function missing | `RoutingUnavailable` |
//! | request node not in the node table | `NotFound("start node not found")` |
//! | node has no graph vertex nearby | `RoutingUnavailable("no nearest vertex for start")` |
//! | search returned no edges | `NotFound("no route found")` |
//! | routing table missing / unusable | `Schema` |

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use indoormap_core::geojson::parse_geometry;
use indoormap_core::route::path_cost;
use indoormap_core::{
    AstarQuery, CacheId, CachedRoute, EdgeId, Feature, FeatureCollection, IsochroneQuery, NodeId,
    PathQuery, PathStep, PlannedRoute, Record, RouteRequest, ViaQuery, VertexId,
};

use crate::config::RoutingConfig;
use crate::error::{ServiceError, ServiceResult, StoreError};
use crate::schema::{resolve_edge_table, resolve_node_table, EdgeTable, NodeTable};
use crate::sql::{EDGE_ID_KEY, GEOJSON_KEY};
use crate::store::MapStore;

pub const PGROUTING_MISSING: &str = concat!(
    "pgRouting not available on database. ",
    "Install the pgrouting extension (CREATE EXTENSION pgrouting) and retry."
);

const ROOM_ROUTE_FUNCTION: &str = "get_route_between_rooms";

/// Resolved tables for one request.
struct Graph {
    edges: EdgeTable,
    nodes: NodeTable,
}

#[derive(Clone)]
pub struct RoutePlanner {
    store: Arc<dyn MapStore>,
    config: RoutingConfig,
}

impl RoutePlanner {
    pub fn new(store: Arc<dyn MapStore>, config: RoutingConfig) -> Self {
        Self { store, config }
    }

    async fn require_functions(&self, names: &[&str], missing: &str) -> ServiceResult<()> {
        let installed = self.store.installed_functions(names).await?;
        if names.iter().all(|n| installed.iter().any(|i| i == n)) {
            Ok(())
        } else {
            Err(ServiceError::RoutingUnavailable(missing.to_string()))
        }
    }

    async fn edge_table(&self) -> ServiceResult<EdgeTable> {
        let table = self.config.edge_table.as_str();
        let edges = resolve_edge_table(table, &self.store.table_columns(table).await?)?;
        if edges.has_topology {
            return Ok(edges);
        }

        self.require_functions(&["pgr_createtopology"], PGROUTING_MISSING).await?;
        info!(table, tolerance = self.config.topology_tolerance, "building routing topology");
        self.store
            .create_topology(&edges, self.config.topology_tolerance)
            .await?;

        let edges = resolve_edge_table(table, &self.store.table_columns(table).await?)?;
        if !edges.has_topology {
            return Err(StoreError::Query(format!(
                "{table} still lacks source/target after pgr_createTopology"
            ))
            .into());
        }
        Ok(edges)
    }

    /// Check `function`, then resolve (and if needed build) the routing tables.
    async fn graph(&self, function: &str) -> ServiceResult<Graph> {
        self.require_functions(&[function], PGROUTING_MISSING).await?;
        let edges = self.edge_table().await?;
        let table = self.config.node_table.as_str();
        let nodes = resolve_node_table(table, &self.store.table_columns(table).await?)?;
        Ok(Graph { edges, nodes })
    }

    async fn snap(&self, graph: &Graph, node: NodeId, role: &str) -> ServiceResult<VertexId> {
        let ewkt = self
            .store
            .node_geometry(&graph.nodes, node)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("{role} node not found")))?;
        self.store
            .nearest_vertex(&graph.edges, &ewkt)
            .await?
            .ok_or_else(|| {
                ServiceError::RoutingUnavailable(format!("no nearest vertex for {role}"))
            })
    }

    async fn snap_pair(
        &self,
        graph: &Graph,
        start: NodeId,
        end: NodeId,
    ) -> ServiceResult<(VertexId, VertexId)> {
        Ok((
            self.snap(graph, start, "start").await?,
            self.snap(graph, end, "end").await?,
        ))
    }

    /// Edge features for a path, or `None` when the path walks no edge.
    async fn path_features(
        &self,
        edges: &EdgeTable,
        steps: &[PathStep],
        leg: Option<usize>,
        cost_offset: f64,
    ) -> ServiceResult<Option<Vec<Feature>>> {
        let ids: Vec<EdgeId> = steps
            .iter()
            .filter(|s| s.traverses_edge())
            .map(|s| s.edge)
            .collect();
        if ids.is_empty() {
            return Ok(None);
        }
        let rows = self.store.edge_records(edges, &ids).await?;
        Ok(Some(path_features(steps, &rows, leg, cost_offset)))
    }

    #[instrument(skip(self), err)]
    pub async fn shortest_path(&self, query: PathQuery) -> ServiceResult<FeatureCollection> {
        let graph = self.graph("pgr_dijkstra").await?;
        let (from, to) = self.snap_pair(&graph, query.start, query.end).await?;
        let steps = self
            .store
            .dijkstra(&graph.edges, from, to, query.directed)
            .await?;
        self.path_features(&graph.edges, &steps, None, 0.0)
            .await?
            .map(FeatureCollection::from)
            .ok_or_else(|| ServiceError::not_found("no route found"))
    }

    #[instrument(skip(self), err)]
    pub async fn astar_path(&self, query: AstarQuery) -> ServiceResult<FeatureCollection> {
        let graph = self.graph("pgr_astar").await?;
        let path = query.path;
        let (from, to) = self.snap_pair(&graph, path.start, path.end).await?;
        let steps = self
            .store
            .astar(&graph.edges, from, to, path.directed, query.heuristic)
            .await?;
        self.path_features(&graph.edges, &steps, None, 0.0)
            .await?
            .map(FeatureCollection::from)
            .ok_or_else(|| ServiceError::not_found("no route found"))
    }

    /// One Dijkstra search per consecutive pair of points.
    #[instrument(skip(self), fields(points = query.points.len()), err)]
    pub async fn via_points(&self, query: ViaQuery) -> ServiceResult<FeatureCollection> {
        let graph = self.graph("pgr_dijkstra").await?;

        let mut snapped: HashMap<NodeId, VertexId> = HashMap::new();
        for (idx, node) in query.points.iter().enumerate() {
            if snapped.contains_key(node) {
                continue;
            }
            let role = format!("via point {idx}");
            snapped.insert(*node, self.snap(&graph, *node, &role).await?);
        }

        let mut features = Vec::new();
        let mut offset = 0.0;
        for (leg, (a, b)) in query.legs().enumerate() {
            let (from, to) = (snapped[&a], snapped[&b]);
            let steps = self
                .store
                .dijkstra(&graph.edges, from, to, query.directed)
                .await?;
            let leg_features = self
                .path_features(&graph.edges, &steps, Some(leg), offset)
                .await?
                .ok_or_else(|| {
                    ServiceError::not_found(format!(
                        "no route found between via points {leg} and {}",
                        leg + 1
                    ))
                })?;
            features.extend(leg_features);
            offset += path_cost(&steps);
        }
        Ok(FeatureCollection::from(features))
    }

    /// Vertices reachable within `max_cost`, as points ordered by cost.
    #[instrument(skip(self), err)]
    pub async fn isochrone(&self, query: IsochroneQuery) -> ServiceResult<FeatureCollection> {
        let graph = self.graph("pgr_dijkstracost").await?;
        let from = self.snap(&graph, query.start, "start").await?;
        let rows = self
            .store
            .reachable_vertices(&graph.edges, from, query.max_cost, query.directed)
            .await?;
        Ok(rows
            .iter()
            .map(|row| Feature::from_record(row, GEOJSON_KEY, &["vertex_id", "agg_cost"][..]))
            .collect())
    }

    /// Room-to-room route via `get_route_between_rooms`, saved to the route
    /// cache. A failed cache write is logged and yields `cache_id: null`.
    #[instrument(skip(self), err)]
    pub async fn route_between_rooms(&self, request: RouteRequest) -> ServiceResult<PlannedRoute> {
        request.validate()?;
        self.require_functions(
            &[ROOM_ROUTE_FUNCTION],
            "get_route_between_rooms is not installed on the database",
        )
        .await?;

        let result = self
            .store
            .route_between_rooms(&request)
            .await?
            .ok_or_else(|| ServiceError::not_found("no route found between rooms"))?;

        let cache_id = match self.store.save_route(&request, &result).await {
            Ok(saved) => Some(saved.id),
            Err(err) => {
                warn!(error = %err, "failed to cache route");
                None
            }
        };
        Ok(PlannedRoute::new(result, cache_id))
    }

    #[instrument(skip(self), err)]
    pub async fn cached_route(&self, id: CacheId) -> ServiceResult<CachedRoute> {
        self.store
            .cached_route(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("cached route not found"))
    }
}

/// Pair path rows with edge rows, in path order.
///
/// Steps without an edge and edges missing from `rows` are skipped. Every
/// feature's properties start with `edge_id, seq, path_seq, node, cost,
/// agg_cost` (shifted by `cost_offset`) and `leg` when given, followed by the
/// edge's own columns. Step values win over same-named edge columns.
pub fn path_features(
    steps: &[PathStep],
    rows: &[Record],
    leg: Option<usize>,
    cost_offset: f64,
) -> Vec<Feature> {
    let by_id: HashMap<i64, &Record> = rows
        .iter()
        .filter_map(|r| r.get(EDGE_ID_KEY).and_then(Value::as_i64).map(|id| (id, r)))
        .collect();

    steps
        .iter()
        .filter(|s| s.traverses_edge())
        .filter_map(|step| {
            let row = by_id.get(&step.edge.get())?;
            let mut props = Record::new();
            props.insert(EDGE_ID_KEY.to_string(), json!(step.edge.get()));
            props.insert("seq".to_string(), json!(step.seq));
            props.insert("path_seq".to_string(), json!(step.path_seq));
            props.insert("node".to_string(), json!(step.node.get()));
            props.insert("cost".to_string(), json!(step.cost));
            props.insert("agg_cost".to_string(), json!(step.agg_cost + cost_offset));
            if let Some(leg) = leg {
                props.insert("leg".to_string(), json!(leg));
            }
            for (key, value) in row.iter() {
                if key != GEOJSON_KEY && !props.contains_key(key) {
                    props.insert(key.clone(), value.clone());
                }
            }
            Some(Feature::new(parse_geometry(row.get(GEOJSON_KEY)), props))
        })
        .collect()
}
