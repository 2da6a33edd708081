//! `indoormap-core`: shared building blocks of the indoor map service.
//!
//! This crate is **pure** (no database, no HTTP): identifiers, the layer
//! catalogue, request parameter validation and the row -> GeoJSON adapter.

pub mod error;
pub mod geojson;
pub mod id;
pub mod layer;
pub mod params;
pub mod route;

pub use error::{MapError, MapResult};
pub use geojson::{Feature, FeatureCollection, Record};
pub use id::{CacheId, EdgeId, NodeId, RoomId, VertexId};
pub use layer::{Layer, LayerKind};
pub use params::{AstarQuery, Heuristic, IsochroneQuery, PathQuery, ViaQuery};
pub use route::{CachedRoute, PathStep, PlannedRoute, RouteRequest, RouteResult};
