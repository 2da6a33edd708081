//! Strongly-typed identifiers used across the service.
//!
//! Every table the service reads is keyed by an integer (`ogc_fid` for the
//! imported layers, bigint vertex/edge ids for the pgRouting topology), so
//! the newtypes wrap `i64`.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::MapError;

/// Room point (`room_points.ogc_fid`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(i64);

/// Navigation node referenced by requests (`nav_nodes.ogc_fid`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(i64);

/// Vertex of the pgRouting topology (`source` / `target`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(i64);

/// Edge of the routing table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(i64);

/// Row of the `route_cache` table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheId(i64);

macro_rules! impl_i64_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = MapError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| MapError::invalid_id(format!("{}: {:?}: {}", $name, s, e)))?;
                Ok(Self(value))
            }
        }
    };
}

impl_i64_newtype!(RoomId, "RoomId");
impl_i64_newtype!(NodeId, "NodeId");
impl_i64_newtype!(VertexId, "VertexId");
impl_i64_newtype!(EdgeId, "EdgeId");
impl_i64_newtype!(CacheId, "CacheId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trimmed_integers() {
        assert_eq!("  42 ".parse::<NodeId>().unwrap(), NodeId::new(42));
        assert_eq!("-1".parse::<EdgeId>().unwrap().get(), -1);
    }

    #[test]
    fn rejects_non_integers() {
        let err = "abc".parse::<RoomId>().unwrap_err();
        assert!(matches!(err, MapError::InvalidId(ref m) if m.starts_with("RoomId")));
        assert!("1.5".parse::<CacheId>().is_err());
        assert!("".parse::<VertexId>().is_err());
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&RoomId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: RoomId = serde_json::from_str("7").unwrap();
        assert_eq!(back, RoomId::new(7));
    }
}
