//! SQL text builders.
//!
//! Identifiers come from [`crate::schema`] and are always quoted; every value
//! is a bind parameter. Row-shaped results are returned as one `jsonb` column
//! (`row_to_json`) so a single decoder handles any column set.

use crate::schema::{CostColumn, EdgeTable, LayerColumns, NodeTable};

/// Key under which builders place the `ST_AsGeoJSON` text.
pub const GEOJSON_KEY: &str = "geojson";

/// Key under which edge rows carry their id.
pub const EDGE_ID_KEY: &str = "edge_id";

pub const TABLE_COLUMNS: &str = r#"
SELECT column_name::text
FROM information_schema.columns
WHERE table_name = $1
  AND table_schema = ANY(current_schemas(false))
ORDER BY ordinal_position
"#;

/// `$1`: lowercase function names.
pub const INSTALLED_FUNCTIONS: &str = r#"
SELECT DISTINCT lower(proname::text)
FROM pg_proc
WHERE lower(proname::text) = ANY($1)
"#;

/// `$1` table, `$2` tolerance, `$3` geometry column, `$4` id column.
pub const CREATE_TOPOLOGY: &str = "SELECT pgr_createTopology($1, $2, $3, $4)::text";

pub const EXTENSION_VERSIONS: &str = r#"
SELECT
    (SELECT extversion::text FROM pg_extension WHERE extname = 'postgis') AS postgis,
    (SELECT extversion::text FROM pg_extension WHERE extname = 'pgrouting') AS pgrouting
"#;

/// `$1` start room, `$2` end room, `$3` simplify tolerance.
pub const ROUTE_BETWEEN_ROOMS: &str = r#"
SELECT r.distance_meters::float8 AS distance_meters, ST_AsGeoJSON(r.route) AS route
FROM get_route_between_rooms($1, $2, $3) AS r
"#;

pub const CREATE_ROUTE_CACHE: &str = r#"
CREATE TABLE IF NOT EXISTS route_cache (
    id                 BIGSERIAL PRIMARY KEY,
    start_room_id      BIGINT NOT NULL,
    end_room_id        BIGINT NOT NULL,
    simplify_tolerance DOUBLE PRECISION NOT NULL DEFAULT 0,
    distance_meters    DOUBLE PRECISION NOT NULL,
    route              JSONB NOT NULL,
    created_at         TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

pub const INSERT_ROUTE_CACHE: &str = r#"
INSERT INTO route_cache (start_room_id, end_room_id, simplify_tolerance, distance_meters, route)
VALUES ($1, $2, $3, $4, $5)
RETURNING id, start_room_id, end_room_id, simplify_tolerance, distance_meters, route, created_at
"#;

pub const SELECT_ROUTE_CACHE: &str = r#"
SELECT id, start_room_id, end_room_id, simplify_tolerance, distance_meters, route, created_at
FROM route_cache
WHERE id = $1
"#;

/// All rows of a layer as `jsonb` records.
pub fn layer_records(layer: &LayerColumns) -> String {
    let mut select: Vec<String> = layer.properties.iter().map(|p| p.quoted()).collect();
    select.push(format!("ST_AsGeoJSON({}) AS {GEOJSON_KEY}", layer.geometry.quoted()));

    let order = if layer.has_property("ogc_fid") {
        " ORDER BY t.ogc_fid"
    } else {
        ""
    };

    format!(
        "SELECT row_to_json(t)::jsonb FROM (SELECT {} FROM {}) t{order}",
        select.join(", "),
        layer.table.quoted(),
    )
}

/// `$1`: node id. Returns EWKT so the SRID survives the round trip.
pub fn node_geometry(nodes: &NodeTable) -> String {
    format!(
        "SELECT ST_AsEWKT({}) FROM {} WHERE {} = $1",
        nodes.geometry.quoted(),
        nodes.table.quoted(),
        nodes.id.quoted(),
    )
}

/// Graph vertices with their positions, derived from edge end points.
fn vertices_cte(edges: &EdgeTable) -> String {
    let g = edges.geometry.quoted();
    let t = edges.table.quoted();
    format!(
        "verts AS (\
SELECT source::int8 AS vid, ST_StartPoint({g}) AS pt FROM {t} WHERE source IS NOT NULL \
UNION ALL \
SELECT target::int8 AS vid, ST_EndPoint({g}) AS pt FROM {t} WHERE target IS NOT NULL)"
    )
}

/// `$1`: EWKT of the point to snap.
pub fn nearest_vertex(edges: &EdgeTable) -> String {
    format!(
        "WITH {} SELECT vid FROM verts WHERE pt IS NOT NULL \
ORDER BY pt <-> ST_GeomFromEWKT($1) LIMIT 1",
        vertices_cte(edges)
    )
}

fn cost_expr(edges: &EdgeTable) -> String {
    match &edges.cost {
        CostColumn::Column(c) => format!("{}::float8", c.quoted()),
        CostColumn::GeometryLength => format!("ST_Length({})::float8", edges.geometry.quoted()),
    }
}

/// Inner edges query handed to `pgr_dijkstra` / `pgr_dijkstraCost`.
pub fn edges_query(edges: &EdgeTable) -> String {
    let mut cols = vec![
        format!("{}::int8 AS id", edges.id.quoted()),
        "source::int8 AS source".to_string(),
        "target::int8 AS target".to_string(),
        format!("{} AS cost", cost_expr(edges)),
    ];
    if let Some(rc) = &edges.reverse_cost {
        cols.push(format!("{}::float8 AS reverse_cost", rc.quoted()));
    }
    format!(
        "SELECT {} FROM {} WHERE source IS NOT NULL AND target IS NOT NULL",
        cols.join(", "),
        edges.table.quoted()
    )
}

/// Inner edges query for `pgr_astar` (adds end-point coordinates).
pub fn astar_edges_query(edges: &EdgeTable) -> String {
    let g = edges.geometry.quoted();
    let base = edges_query(edges);
    let (head, tail) = base
        .split_once(" FROM ")
        .unwrap_or((base.as_str(), ""));
    format!(
        "{head}, \
ST_X(ST_StartPoint({g}))::float8 AS x1, ST_Y(ST_StartPoint({g}))::float8 AS y1, \
ST_X(ST_EndPoint({g}))::float8 AS x2, ST_Y(ST_EndPoint({g}))::float8 AS y2 \
FROM {tail}"
    )
}

/// `$1` edges query, `$2` start vertex, `$3` end vertex, `$4` directed.
pub const DIJKSTRA: &str = r#"
SELECT seq::int4 AS seq, path_seq::int4 AS path_seq, node::int8 AS node, edge::int8 AS edge,
       cost::float8 AS cost, agg_cost::float8 AS agg_cost
FROM pgr_dijkstra($1, $2::int8, $3::int8, directed => $4)
ORDER BY seq
"#;

/// `$1` edges query, `$2` start, `$3` end, `$4` directed, `$5` heuristic.
pub const ASTAR: &str = r#"
SELECT seq::int4 AS seq, path_seq::int4 AS path_seq, node::int8 AS node, edge::int8 AS edge,
       cost::float8 AS cost, agg_cost::float8 AS agg_cost
FROM pgr_astar($1, $2::int8, $3::int8, directed => $4, heuristic => $5::int4)
ORDER BY seq
"#;

/// `$1`: edge ids. Records carry `edge_id`, the edge's property columns and
/// the GeoJSON text.
pub fn edge_records(edges: &EdgeTable) -> String {
    let mut select = vec![format!("{}::int8 AS {EDGE_ID_KEY}", edges.id.quoted())];
    select.extend(edges.properties.iter().map(|p| p.quoted()));
    select.push(format!("ST_AsGeoJSON({}) AS {GEOJSON_KEY}", edges.geometry.quoted()));
    format!(
        "SELECT row_to_json(t)::jsonb FROM (SELECT {} FROM {} WHERE {}::int8 = ANY($1)) t",
        select.join(", "),
        edges.table.quoted(),
        edges.id.quoted(),
    )
}

/// `$1` edges query, `$2` start vertex, `$3` directed, `$4` max cost.
///
/// Records carry `vertex_id`, `agg_cost` and the vertex point; the start
/// vertex is always present with cost 0.
pub fn reachable_vertices(edges: &EdgeTable) -> String {
    format!(
        "WITH {verts}, \
unique_verts AS (SELECT DISTINCT ON (vid) vid, pt FROM verts WHERE pt IS NOT NULL ORDER BY vid), \
reach AS (\
SELECT end_vid AS vid, agg_cost FROM pgr_dijkstraCost($1, $2::int8, ARRAY(SELECT vid FROM unique_verts), directed => $3) \
WHERE agg_cost <= $4 \
UNION ALL SELECT $2::int8, 0::float8) \
SELECT row_to_json(t)::jsonb FROM (\
SELECT r.vid AS vertex_id, min(r.agg_cost)::float8 AS agg_cost, ST_AsGeoJSON(u.pt) AS {GEOJSON_KEY} \
FROM reach r JOIN unique_verts u ON u.vid = r.vid GROUP BY r.vid, u.pt) t \
ORDER BY (t.agg_cost), (t.vertex_id)",
        verts = vertices_cte(edges),
    )
}
