//! Validation of routing query parameters.
//!
//! Handlers receive raw query-string values (`Option<&str>`) and turn them
//! into typed queries here, so every endpoint reports the same messages for
//! the same mistakes.

use crate::error::{MapError, MapResult};
use crate::id::NodeId;

/// Parse a required identifier parameter.
pub fn required_id<T>(name: &str, raw: Option<&str>) -> MapResult<T>
where
    T: core::str::FromStr<Err = MapError>,
{
    match raw.map(str::trim) {
        None | Some("") => Err(MapError::validation(format!("missing parameter `{name}`"))),
        Some(v) => v.parse::<T>().map_err(|_| {
            MapError::validation(format!("parameter `{name}` must be an integer, got {v:?}"))
        }),
    }
}

/// Parse an optional boolean flag (`true/false`, `1/0`, `yes/no`).
pub fn optional_bool(name: &str, raw: Option<&str>, default: bool) -> MapResult<bool> {
    match raw.map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v.is_empty() => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(MapError::validation(format!(
                "parameter `{name}` must be a boolean, got {v:?}"
            ))),
        },
    }
}

/// Node-to-node path request (`pgr_dijkstra`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathQuery {
    pub start: NodeId,
    pub end: NodeId,
    pub directed: bool,
}

impl PathQuery {
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        directed: Option<&str>,
    ) -> MapResult<Self> {
        if start.is_none_or(|s| s.trim().is_empty()) || end.is_none_or(|s| s.trim().is_empty()) {
            return Err(MapError::validation("provide start and end nav_nodes ogc_fid"));
        }
        Ok(Self {
            start: required_id("start", start)?,
            end: required_id("end", end)?,
            directed: optional_bool("directed", directed, false)?,
        })
    }
}

/// A* heuristic selector understood by `pgr_astar` (0..=5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heuristic(u8);

impl Heuristic {
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> MapResult<Self> {
        if value > Self::MAX {
            return Err(MapError::validation(format!(
                "heuristic must be between 0 and {}, got {value}",
                Self::MAX
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn parse(raw: Option<&str>) -> MapResult<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(v) => {
                let n = v.parse::<u8>().map_err(|_| {
                    MapError::validation(format!(
                        "heuristic must be between 0 and {}, got {v:?}",
                        Self::MAX
                    ))
                })?;
                Self::new(n)
            }
        }
    }
}

impl Default for Heuristic {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

/// Node-to-node A* request (`pgr_astar`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AstarQuery {
    pub path: PathQuery,
    pub heuristic: Heuristic,
}

impl AstarQuery {
    pub fn parse(
        start: Option<&str>,
        end: Option<&str>,
        directed: Option<&str>,
        heuristic: Option<&str>,
    ) -> MapResult<Self> {
        Ok(Self {
            path: PathQuery::parse(start, end, directed)?,
            heuristic: Heuristic::parse(heuristic)?,
        })
    }
}

/// Multi-leg route through an ordered list of nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViaQuery {
    pub points: Vec<NodeId>,
    pub directed: bool,
}

impl ViaQuery {
    pub fn parse(points: Option<&str>, directed: Option<&str>) -> MapResult<Self> {
        let raw = points
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                MapError::validation(
                    "provide `points` as a comma-separated list of nav_nodes ogc_fid",
                )
            })?;

        let mut parsed = Vec::new();
        for part in raw.split(',') {
            parsed.push(required_id::<NodeId>("points", Some(part))?);
        }

        if parsed.len() < 2 {
            return Err(MapError::validation("at least two via points are required"));
        }
        if let Some(w) = parsed.windows(2).find(|w| w[0] == w[1]) {
            return Err(MapError::validation(format!(
                "consecutive via points must differ (node {})",
                w[0]
            )));
        }

        Ok(Self {
            points: parsed,
            directed: optional_bool("directed", directed, false)?,
        })
    }

    /// Consecutive `(from, to)` pairs, one per leg.
    pub fn legs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }
}

/// Reachability request (`pgr_dijkstraCost` bounded by `max_cost`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsochroneQuery {
    pub start: NodeId,
    pub max_cost: f64,
    pub directed: bool,
}

impl IsochroneQuery {
    pub fn parse(
        start: Option<&str>,
        max_cost: Option<&str>,
        directed: Option<&str>,
    ) -> MapResult<Self> {
        let start = required_id("start", start)?;
        let raw = max_cost
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MapError::validation("missing parameter `max_cost`"))?;
        let max_cost = raw.parse::<f64>().map_err(|_| {
            MapError::validation(format!("parameter `max_cost` must be a number, got {raw:?}"))
        })?;
        if !max_cost.is_finite() || max_cost <= 0.0 {
            return Err(MapError::validation("parameter `max_cost` must be a positive number"));
        }
        Ok(Self {
            start,
            max_cost,
            directed: optional_bool("directed", directed, false)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_query_requires_both_nodes() {
        let err = PathQuery::parse(Some("1"), None, None).unwrap_err();
        assert_eq!(err, MapError::validation("provide start and end nav_nodes ogc_fid"));

        let q = PathQuery::parse(Some("1"), Some(" 2 "), Some("true")).unwrap();
        assert_eq!(q.start, NodeId::new(1));
        assert_eq!(q.end, NodeId::new(2));
        assert!(q.directed);
    }

    #[test]
    fn path_query_rejects_non_integer_ids() {
        let err = PathQuery::parse(Some("a"), Some("2"), None).unwrap_err();
        assert!(matches!(err, MapError::Validation(ref m) if m.contains("`start`")));
    }

    #[test]
    fn bool_flags() {
        assert!(!optional_bool("d", None, false).unwrap());
        assert!(optional_bool("d", Some("YES"), false).unwrap());
        assert!(!optional_bool("d", Some("0"), true).unwrap());
        assert!(optional_bool("d", Some("maybe"), false).is_err());
    }

    #[test]
    fn heuristic_bounds() {
        assert_eq!(Heuristic::parse(None).unwrap().get(), 5);
        assert_eq!(Heuristic::parse(Some("0")).unwrap().get(), 0);
        assert!(Heuristic::parse(Some("6")).is_err());
        assert!(Heuristic::parse(Some("-1")).is_err());
    }

    #[test]
    fn via_query_needs_two_distinct_consecutive_points() {
        assert!(ViaQuery::parse(None, None).is_err());
        assert!(ViaQuery::parse(Some("3"), None).is_err());
        assert!(ViaQuery::parse(Some("3,3"), None).is_err());
        assert!(ViaQuery::parse(Some("3,x"), None).is_err());

        let q = ViaQuery::parse(Some("3, 4,3"), None).unwrap();
        let legs: Vec<_> = q.legs().collect();
        assert_eq!(
            legs,
            vec![(NodeId::new(3), NodeId::new(4)), (NodeId::new(4), NodeId::new(3))]
        );
    }

    #[test]
    fn isochrone_needs_positive_finite_cost() {
        assert!(IsochroneQuery::parse(Some("1"), None, None).is_err());
        assert!(IsochroneQuery::parse(Some("1"), Some("0"), None).is_err());
        assert!(IsochroneQuery::parse(Some("1"), Some("-3"), None).is_err());
        assert!(IsochroneQuery::parse(Some("1"), Some("inf"), None).is_err());
        assert!(IsochroneQuery::parse(Some("1"), Some("NaN"), None).is_err());
        let q = IsochroneQuery::parse(Some("1"), Some("12.5"), None).unwrap();
        assert_eq!(q.max_cost, 12.5);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any list of >= 2 ids without consecutive repeats parses back unchanged.
            #[test]
            fn via_points_round_trip(ids in proptest::collection::vec(1i64..10_000, 2..12)) {
                prop_assume!(ids.windows(2).all(|w| w[0] != w[1]));
                let raw = ids.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",");
                let q = ViaQuery::parse(Some(&raw), None).unwrap();
                prop_assert_eq!(q.points.iter().map(|n| n.get()).collect::<Vec<_>>(), ids.clone());
                prop_assert_eq!(q.legs().count(), ids.len() - 1);
            }

            /// Property: heuristic parsing accepts exactly 0..=5.
            #[test]
            fn heuristic_range(n in 0u8..=255) {
                let parsed = Heuristic::parse(Some(&n.to_string()));
                prop_assert_eq!(parsed.is_ok(), n <= Heuristic::MAX);
            }
        }
    }
}
