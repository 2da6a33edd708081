//! Read-only layer queries.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::instrument;
use utoipa::ToSchema;

use indoormap_core::geojson::{parse_geometry, rows_to_feature_collection};
use indoormap_core::{FeatureCollection, Layer, Record, RoomId};

use crate::error::{ServiceResult, StoreError};
use crate::schema::{resolve_layer, LayerColumns};
use crate::sql::GEOJSON_KEY;
use crate::store::MapStore;

/// Entry of the rooms list.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Room {
    #[schema(value_type = i64)]
    pub id: RoomId,
    pub name: Option<String>,
    /// GeoJSON point, `null` when the row has no usable geometry.
    #[schema(value_type = Option<Object>)]
    pub location: Option<Value>,
}

/// One `base_floor` entity with its geometry decoded.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BaseFloorItem {
    pub ogc_fid: i64,
    pub layer: Option<String>,
    pub paperspace: Option<bool>,
    pub text: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub geometry: Option<Value>,
}

fn row_id(row: &Record, table: &str) -> ServiceResult<i64> {
    row.get("ogc_fid")
        .and_then(Value::as_i64)
        .ok_or_else(|| StoreError::Decode(format!("{table} row without ogc_fid")).into())
}

fn text(row: &Record, key: &str) -> Option<String> {
    row.get(key).and_then(Value::as_str).map(str::to_string)
}

#[derive(Clone)]
pub struct LayerService {
    store: Arc<dyn MapStore>,
}

impl LayerService {
    pub fn new(store: Arc<dyn MapStore>) -> Self {
        Self { store }
    }

    async fn resolve(&self, layer: Layer, wanted: &[&str]) -> ServiceResult<LayerColumns> {
        let available = self.store.table_columns(layer.table()).await?;
        Ok(resolve_layer(layer.table(), wanted, &available)?)
    }

    async fn records(&self, layer: Layer, wanted: &[&str]) -> ServiceResult<Vec<Record>> {
        let columns = self.resolve(layer, wanted).await?;
        Ok(self.store.layer_records(&columns).await?)
    }

    /// Every row of `layer` as a GeoJSON feature.
    #[instrument(skip(self), fields(layer = %layer), err)]
    pub async fn feature_collection(&self, layer: Layer) -> ServiceResult<FeatureCollection> {
        let columns = self.resolve(layer, layer.property_columns()).await?;
        let rows = self.store.layer_records(&columns).await?;
        Ok(rows_to_feature_collection(&rows, GEOJSON_KEY, &columns.property_names()))
    }

    #[instrument(skip(self), err)]
    pub async fn rooms(&self) -> ServiceResult<Vec<Room>> {
        let rows = self.records(Layer::RoomPoints, &["ogc_fid", "text"]).await?;
        rows.iter()
            .map(|row| -> ServiceResult<Room> {
                Ok(Room {
                    id: RoomId::new(row_id(row, "room_points")?),
                    name: text(row, "text"),
                    location: parse_geometry(row.get(GEOJSON_KEY)),
                })
            })
            .collect()
    }

    /// Flat base floor rows with `geometry` decoded from GeoJSON text.
    #[instrument(skip(self), err)]
    pub async fn base_floor_items(&self) -> ServiceResult<Vec<BaseFloorItem>> {
        let rows = self
            .records(Layer::BaseFloor, &["ogc_fid", "layer", "paperspace", "text"])
            .await?;
        rows.iter()
            .map(|row| -> ServiceResult<BaseFloorItem> {
                Ok(BaseFloorItem {
                    ogc_fid: row_id(row, "base_floor")?,
                    layer: text(row, "layer"),
                    paperspace: row.get("paperspace").and_then(Value::as_bool),
                    text: text(row, "text"),
                    geometry: parse_geometry(row.get(GEOJSON_KEY)),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::schema::SchemaError;
    use crate::store::InMemoryMapStore;
    use serde_json::json;

    fn service(store: InMemoryMapStore) -> LayerService {
        LayerService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn feature_collection_has_one_feature_per_row() {
        let fc = service(InMemoryMapStore::sample())
            .feature_collection(Layer::BaseFloor)
            .await
            .unwrap();
        assert_eq!(fc.len(), 3);
        let first = &fc.features[0];
        assert_eq!(first.geometry.as_ref().unwrap()["type"], json!("LineString"));
        let keys: Vec<&str> = first.properties.keys().map(String::as_str).collect();
        assert_eq!(
            keys.len(),
            Layer::BaseFloor.property_columns().len(),
            "every CAD column is exposed"
        );
    }

    #[tokio::test]
    async fn edge_layer_exposes_topology_columns() {
        let fc = service(InMemoryMapStore::sample())
            .feature_collection(Layer::NavEdgesFinal)
            .await
            .unwrap();
        assert_eq!(fc.features[0].properties["source"], json!(10));
        assert!(!fc.features[0].properties.contains_key("metres"));
    }

    #[tokio::test]
    async fn missing_table_is_a_schema_error() {
        let err = service(InMemoryMapStore::sample())
            .feature_collection(Layer::NavEdgesProj)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::Schema(SchemaError::MissingTable("nav_edges_proj".into()))
        );
    }

    #[tokio::test]
    async fn rooms_list_ids_names_and_points() {
        let rooms = service(InMemoryMapStore::sample()).rooms().await.unwrap();
        assert_eq!(rooms.len(), 3);
        assert_eq!(rooms[0].id, RoomId::new(1));
        assert_eq!(rooms[0].name.as_deref(), Some("Lab 101"));
        assert_eq!(rooms[0].location.as_ref().unwrap()["type"], json!("Point"));
        assert_eq!(rooms[2].name, None);
    }

    #[tokio::test]
    async fn base_floor_items_decode_geometry() {
        let items = service(InMemoryMapStore::sample()).base_floor_items().await.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].ogc_fid, 3);
        assert_eq!(items[2].text.as_deref(), Some("D1"));
        assert_eq!(items[2].paperspace, Some(false));
        assert_eq!(items[2].geometry.as_ref().unwrap()["type"], json!("Point"));

        let wire = serde_json::to_value(&items[0]).unwrap();
        let keys: Vec<&str> = wire.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["ogc_fid", "layer", "paperspace", "text", "geometry"]);
    }

    #[tokio::test]
    async fn store_outage_propagates() {
        let store = InMemoryMapStore::sample();
        store.set_unavailable(true);
        let err = service(store).rooms().await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::Unavailable(_))));
    }
}
