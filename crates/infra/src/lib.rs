//! Infrastructure layer: PostGIS/pgRouting access, configuration and the
//! layer / routing services built on top of it.

pub mod config;
pub mod error;
pub mod layers;
pub mod routing;
pub mod schema;
pub mod sql;
pub mod store;

pub use config::{AppConfig, ConfigError, DatabaseConfig, HttpConfig, RoutingConfig};
pub use error::{ServiceError, ServiceResult, StoreError, StoreResult};
pub use layers::{BaseFloorItem, LayerService, Room};
pub use routing::RoutePlanner;
pub use store::{DatabaseStatus, InMemoryMapStore, MapStore, PostgresMapStore};
