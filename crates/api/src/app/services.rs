use std::sync::Arc;

use anyhow::Context;

use indoormap_infra::{
    AppConfig, LayerService, MapStore, PostgresMapStore, RoutePlanner, RoutingConfig,
};

/// Services shared by every handler.
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn MapStore>,
    pub layers: LayerService,
    pub planner: RoutePlanner,
}

impl AppServices {
    pub fn new(store: Arc<dyn MapStore>, routing: RoutingConfig) -> Self {
        Self {
            layers: LayerService::new(store.clone()),
            planner: RoutePlanner::new(store.clone(), routing),
            store,
        }
    }
}

/// Connect to Postgres and make sure the tables the service owns exist.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let store = PostgresMapStore::connect(&config.database)
        .await
        .context("failed to connect to the database")?;
    store
        .ensure_route_cache()
        .await
        .context("failed to prepare the route_cache table")?;

    Ok(AppServices::new(Arc::new(store), config.routing.clone()))
}
