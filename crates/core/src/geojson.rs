//! Row -> GeoJSON adapter.
//!
//! Queries return flat rows where the geometry column has already been
//! serialized by PostGIS (`ST_AsGeoJSON`). This module turns those rows into
//! `Feature` / `FeatureCollection` values.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::openapi::schema::{ArrayBuilder, ObjectBuilder, SchemaType, Type};
use utoipa::openapi::{RefOr, Schema};
use utoipa::{PartialSchema, ToSchema};

/// A flat result row keyed by column name. Keys keep insertion order.
pub type Record = Map<String, Value>;

/// A GeoJSON `Feature`.
///
/// `geometry` is `null` when the row had no geometry or PostGIS produced
/// something that is not a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature {
    pub geometry: Option<Value>,
    pub properties: Record,
}

impl Feature {
    pub fn new(geometry: Option<Value>, properties: Record) -> Self {
        Self { geometry, properties }
    }

    /// Build a feature from one row: geometry from `geom_key`, properties
    /// from exactly `props_keys` (missing keys become `null`).
    pub fn from_record<S: AsRef<str>>(row: &Record, geom_key: &str, props_keys: &[S]) -> Self {
        let geometry = parse_geometry(row.get(geom_key));
        let properties = props_keys
            .iter()
            .map(|k| {
                let k = k.as_ref();
                (k.to_string(), row.get(k).cloned().unwrap_or(Value::Null))
            })
            .collect();
        Self { geometry, properties }
    }
}

fn type_tag(tag: &str) -> ObjectBuilder {
    ObjectBuilder::new()
        .schema_type(Type::String)
        .enum_values(Some([tag]))
}

impl PartialSchema for Feature {
    fn schema() -> RefOr<Schema> {
        ObjectBuilder::new()
            .property("type", type_tag("Feature"))
            .required("type")
            .property(
                "geometry",
                ObjectBuilder::new()
                    .schema_type(SchemaType::AnyValue)
                    .description(Some("GeoJSON geometry, or null")),
            )
            .required("geometry")
            .property("properties", ObjectBuilder::new())
            .required("properties")
            .into()
    }
}

impl ToSchema for Feature {
    fn name() -> Cow<'static, str> {
        Cow::Borrowed("Feature")
    }
}

/// A GeoJSON `FeatureCollection`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl PartialSchema for FeatureCollection {
    fn schema() -> RefOr<Schema> {
        ObjectBuilder::new()
            .property("type", type_tag("FeatureCollection"))
            .required("type")
            .property("features", ArrayBuilder::new().items(Feature::schema()))
            .required("features")
            .into()
    }
}

impl ToSchema for FeatureCollection {
    fn name() -> Cow<'static, str> {
        Cow::Borrowed("FeatureCollection")
    }
}

impl From<Vec<Feature>> for FeatureCollection {
    fn from(features: Vec<Feature>) -> Self {
        Self { features }
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().collect(),
        }
    }
}

/// Convert rows into a `FeatureCollection`, one feature per row.
pub fn rows_to_feature_collection<S: AsRef<str>>(
    rows: &[Record],
    geom_key: &str,
    props_keys: &[S],
) -> FeatureCollection {
    rows.iter()
        .map(|row| Feature::from_record(row, geom_key, props_keys))
        .collect()
}

/// Parse a pre-serialized geometry column.
///
/// Accepts GeoJSON text or an already-decoded object. Anything else (NULL,
/// empty text, invalid JSON, scalars) yields `None`.
pub fn parse_geometry(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => match serde_json::from_str::<Value>(s) {
            Ok(v @ Value::Object(_)) => Some(v),
            _ => None,
        },
        v @ Value::Object(_) => Some(v.clone()),
        _ => None,
    }
}
