use std::sync::Arc;

use anyhow::Context;

use indoormap_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    indoormap_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        database = ?config.database,
        routing = ?config.routing,
        "starting indoormap-api"
    );

    let services = Arc::new(indoormap_api::app::services::build_services(&config).await?);
    let app = indoormap_api::app::build_app(services, &config.http);

    let listener = tokio::net::TcpListener::bind(config.http.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.http.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
