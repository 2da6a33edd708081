//! Routing results and the room-to-room route request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::{MapError, MapResult};
use crate::id::{CacheId, EdgeId, RoomId, VertexId};

/// One row of a pgRouting path result.
///
/// pgRouting closes every path with a row whose `edge` is `-1`; that row
/// carries the destination vertex and the total `agg_cost`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub seq: i32,
    pub path_seq: i32,
    pub node: VertexId,
    pub edge: EdgeId,
    pub cost: f64,
    pub agg_cost: f64,
}

impl PathStep {
    /// Whether this row walks along an edge (the terminal row does not).
    pub fn traverses_edge(&self) -> bool {
        self.edge.get() > 0
    }
}

/// Total cost of a path: the terminal row's `agg_cost`, or the sum of step
/// costs when the terminal row is missing.
pub fn path_cost(steps: &[PathStep]) -> f64 {
    match steps.last() {
        Some(last) if !last.traverses_edge() => last.agg_cost,
        _ => steps.iter().map(|s| s.cost).sum(),
    }
}

/// Body of `POST /api/v1/route/`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RouteRequest {
    #[schema(value_type = i64)]
    pub start_room_id: RoomId,
    #[schema(value_type = i64)]
    pub end_room_id: RoomId,
    /// Simplification tolerance passed to `get_route_between_rooms`.
    #[serde(default)]
    #[schema(minimum = 0.0, default = 0.0)]
    pub simplify_tolerance: f64,
}

impl RouteRequest {
    pub fn validate(&self) -> MapResult<()> {
        if !self.simplify_tolerance.is_finite() || self.simplify_tolerance < 0.0 {
            return Err(MapError::validation("simplify_tolerance must be a non-negative number"));
        }
        Ok(())
    }
}

/// Output of the `get_route_between_rooms` stored function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub distance_meters: f64,
    /// GeoJSON LineString.
    pub route: Value,
}

/// A route result as returned to clients, with the cache row it was saved to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlannedRoute {
    /// `null` when the result could not be cached.
    #[schema(value_type = Option<i64>)]
    pub cache_id: Option<CacheId>,
    pub distance_meters: f64,
    /// GeoJSON LineString.
    #[schema(value_type = Object)]
    pub route: Value,
}

impl PlannedRoute {
    pub fn new(result: RouteResult, cache_id: Option<CacheId>) -> Self {
        Self {
            cache_id,
            distance_meters: result.distance_meters,
            route: result.route,
        }
    }
}

/// A persisted row of `route_cache`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CachedRoute {
    #[schema(value_type = i64)]
    pub id: CacheId,
    #[schema(value_type = i64)]
    pub start_room_id: RoomId,
    #[schema(value_type = i64)]
    pub end_room_id: RoomId,
    pub simplify_tolerance: f64,
    pub distance_meters: f64,
    #[schema(value_type = Object)]
    pub route: Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(seq: i32, edge: i64, cost: f64, agg_cost: f64) -> PathStep {
        PathStep {
            seq,
            path_seq: seq,
            node: VertexId::new(seq as i64),
            edge: EdgeId::new(edge),
            cost,
            agg_cost,
        }
    }

    #[test]
    fn terminal_row_does_not_traverse() {
        assert!(step(1, 10, 1.0, 0.0).traverses_edge());
        assert!(!step(2, -1, 0.0, 1.0).traverses_edge());
    }

    #[test]
    fn path_cost_prefers_terminal_agg_cost() {
        let steps = vec![step(1, 10, 1.5, 0.0), step(2, 11, 2.0, 1.5), step(3, -1, 0.0, 3.5)];
        assert_eq!(path_cost(&steps), 3.5);
        assert_eq!(path_cost(&steps[..2]), 3.5);
        assert_eq!(path_cost(&[]), 0.0);
    }

    #[test]
    fn route_request_defaults_tolerance() {
        let req: RouteRequest =
            serde_json::from_value(json!({ "start_room_id": 1, "end_room_id": 2 })).unwrap();
        assert_eq!(req.simplify_tolerance, 0.0);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn route_request_rejects_negative_tolerance() {
        let req = RouteRequest {
            start_room_id: RoomId::new(1),
            end_room_id: RoomId::new(2),
            simplify_tolerance: -0.1,
        };
        assert!(matches!(req.validate(), Err(MapError::Validation(_))));
    }
}
