//! Schema introspection helpers.
//!
//! The imported tables drift between deployments (`ogc_fid` vs `id`,
//! `wkb_geometry` vs `geom`, `cost` vs `metres`). Queries are therefore built
//! from the column list reported by `information_schema`, resolved here into
//! validated identifiers.

use thiserror::Error;

use indoormap_core::layer::{GEOMETRY_CANDIDATES, ID_CANDIDATES};

/// Columns that may hold an edge's traversal cost, in preference order.
pub const COST_CANDIDATES: &[&str] = &["cost", "metres", "length"];

/// Postgres truncates identifiers longer than this.
const MAX_IDENT_LEN: usize = 63;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("table {0} does not exist or has no columns")]
    MissingTable(String),

    #[error("table {table} has none of the columns {candidates:?}")]
    MissingColumn {
        table: String,
        candidates: Vec<String>,
    },
}

/// A validated SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

impl Ident {
    pub fn new(name: impl Into<String>) -> Result<Self, SchemaError> {
        let name = name.into();
        let mut chars = name.chars();
        let head_ok = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !head_ok || !tail_ok || name.len() > MAX_IDENT_LEN {
            return Err(SchemaError::InvalidIdentifier(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form, safe to splice into SQL text.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl core::fmt::Display for Ident {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// First candidate present in `available`.
pub fn pick_column(available: &[String], candidates: &[&str]) -> Option<Ident> {
    candidates
        .iter()
        .find(|c| available.iter().any(|a| a == *c))
        .and_then(|c| Ident::new(*c).ok())
}

fn require_column(
    table: &Ident,
    available: &[String],
    candidates: &[&str],
) -> Result<Ident, SchemaError> {
    pick_column(available, candidates).ok_or_else(|| SchemaError::MissingColumn {
        table: table.to_string(),
        candidates: candidates.iter().map(|c| c.to_string()).collect(),
    })
}

fn ensure_table(table: &Ident, available: &[String]) -> Result<(), SchemaError> {
    if available.is_empty() {
        return Err(SchemaError::MissingTable(table.to_string()));
    }
    Ok(())
}

fn present(available: &[String], wanted: &[&str]) -> Vec<Ident> {
    wanted
        .iter()
        .filter(|w| available.iter().any(|a| a == *w))
        .filter_map(|w| Ident::new(*w).ok())
        .collect()
}

/// Columns to select for a GeoJSON layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerColumns {
    pub table: Ident,
    /// Property columns that exist, in declared order.
    pub properties: Vec<Ident>,
    pub geometry: Ident,
}

impl LayerColumns {
    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(Ident::as_str).collect()
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.as_str() == name)
    }
}

pub fn resolve_layer(
    table: &str,
    wanted: &[&str],
    available: &[String],
) -> Result<LayerColumns, SchemaError> {
    let table = Ident::new(table)?;
    ensure_table(&table, available)?;
    let geometry = require_column(&table, available, GEOMETRY_CANDIDATES)?;
    Ok(LayerColumns {
        properties: present(available, wanted),
        table,
        geometry,
    })
}

/// How an edge's cost is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CostColumn {
    Column(Ident),
    /// No cost column: use `ST_Length(geometry)`.
    GeometryLength,
}

/// Resolved routing edge table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeTable {
    pub table: Ident,
    pub id: Ident,
    pub geometry: Ident,
    pub cost: CostColumn,
    pub reverse_cost: Option<Ident>,
    /// `source` and `target` both exist (topology has been built).
    pub has_topology: bool,
    /// Extra attribute columns copied onto path features.
    pub properties: Vec<Ident>,
}

pub fn resolve_edge_table(table: &str, available: &[String]) -> Result<EdgeTable, SchemaError> {
    let table = Ident::new(table)?;
    ensure_table(&table, available)?;
    let id = require_column(&table, available, ID_CANDIDATES)?;
    let geometry = require_column(&table, available, GEOMETRY_CANDIDATES)?;
    let cost = pick_column(available, COST_CANDIDATES)
        .map(CostColumn::Column)
        .unwrap_or(CostColumn::GeometryLength);
    let reverse_cost = pick_column(available, &["reverse_cost"]);
    let has_topology = present(available, &["source", "target"]).len() == 2;
    let properties = present(available, indoormap_core::Layer::NavEdgesFinal.property_columns())
        .into_iter()
        .filter(|p| *p != id)
        .collect();

    Ok(EdgeTable {
        table,
        id,
        geometry,
        cost,
        reverse_cost,
        has_topology,
        properties,
    })
}

/// Resolved navigation node table (requests refer to nodes by id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTable {
    pub table: Ident,
    pub id: Ident,
    pub geometry: Ident,
}

pub fn resolve_node_table(table: &str, available: &[String]) -> Result<NodeTable, SchemaError> {
    let table = Ident::new(table)?;
    ensure_table(&table, available)?;
    Ok(NodeTable {
        id: require_column(&table, available, ID_CANDIDATES)?,
        geometry: require_column(&table, available, GEOMETRY_CANDIDATES)?,
        table,
    })
}
