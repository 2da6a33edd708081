//! Catalogue of the map layers served as GeoJSON.

use core::str::FromStr;

use crate::error::MapError;

/// Columns that may hold the geometry, in preference order.
pub const GEOMETRY_CANDIDATES: &[&str] = &["wkb_geometry", "geom", "the_geom"];

/// Columns that may hold the row identifier, in preference order.
pub const ID_CANDIDATES: &[&str] = &["ogc_fid", "id", "gid"];

const CAD_COLUMNS: &[&str] = &[
    "ogc_fid",
    "layer",
    "paperspace",
    "subclasses",
    "linetype",
    "entityhandle",
    "text",
];

const NODE_COLUMNS: &[&str] = &["ogc_fid", "fid", "node_type"];

const EDGE_COLUMNS: &[&str] = &[
    "ogc_fid",
    "id",
    "fid",
    "source",
    "target",
    "cost",
    "reverse_cost",
    "metres",
    "length",
];

/// Shape of a layer's attribute table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LayerKind {
    /// Drawing entities imported from CAD (`layer`, `text`, ...).
    Cad,
    /// Navigation points.
    Node,
    /// Navigation line strings.
    Edge,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Layer {
    BaseFloor,
    Corridors,
    RoomPoints,
    NavNodes,
    NavNodesProj,
    NavNodesSnapped,
    NavEdges,
    NavEdgesProj,
    NavEdgesFinal,
}

impl Layer {
    pub const ALL: [Layer; 9] = [
        Layer::BaseFloor,
        Layer::Corridors,
        Layer::RoomPoints,
        Layer::NavNodes,
        Layer::NavNodesProj,
        Layer::NavNodesSnapped,
        Layer::NavEdges,
        Layer::NavEdgesProj,
        Layer::NavEdgesFinal,
    ];

    /// Database table backing the layer. Also used as the URL segment.
    pub fn table(self) -> &'static str {
        match self {
            Layer::BaseFloor => "base_floor",
            Layer::Corridors => "corridors",
            Layer::RoomPoints => "room_points",
            Layer::NavNodes => "nav_nodes",
            Layer::NavNodesProj => "nav_nodes_proj",
            Layer::NavNodesSnapped => "nav_nodes_snapped",
            Layer::NavEdges => "nav_edges",
            Layer::NavEdgesProj => "nav_edges_proj",
            Layer::NavEdgesFinal => "nav_edges_final",
        }
    }

    pub fn kind(self) -> LayerKind {
        match self {
            Layer::BaseFloor | Layer::Corridors | Layer::RoomPoints => LayerKind::Cad,
            Layer::NavNodes | Layer::NavNodesProj | Layer::NavNodesSnapped => LayerKind::Node,
            Layer::NavEdges | Layer::NavEdgesProj | Layer::NavEdgesFinal => LayerKind::Edge,
        }
    }

    /// Attribute columns exposed as feature properties, in output order.
    ///
    /// The table may lack some of them; callers intersect with the live schema.
    pub fn property_columns(self) -> &'static [&'static str] {
        match self.kind() {
            LayerKind::Cad => CAD_COLUMNS,
            LayerKind::Node => NODE_COLUMNS,
            LayerKind::Edge => EDGE_COLUMNS,
        }
    }
}

impl core::fmt::Display for Layer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for Layer {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layer::ALL
            .into_iter()
            .find(|l| l.table() == s)
            .ok_or_else(|| MapError::not_found(format!("unknown layer: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_round_trip_through_from_str() {
        for layer in Layer::ALL {
            assert_eq!(layer.table().parse::<Layer>().unwrap(), layer);
        }
        assert!("path_ways".parse::<Layer>().is_err());
    }

    #[test]
    fn property_columns_follow_kind() {
        assert_eq!(Layer::Corridors.property_columns()[1], "layer");
        assert!(Layer::NavNodesSnapped.property_columns().contains(&"node_type"));
        assert!(Layer::NavEdgesFinal.property_columns().contains(&"source"));
        for layer in Layer::ALL {
            for g in GEOMETRY_CANDIDATES {
                assert!(!layer.property_columns().contains(g));
            }
        }
    }
}
