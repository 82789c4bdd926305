// Backyard - idea-map notes server
// Entry point and server setup

use anyhow::Context;
use backyard::api::build_router;
use backyard::app;
use backyard::config::ServerConfig;
use backyard::services::{Frequency, SchedulerService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backyard=debug,tower_http=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Backyard server");

    let config = ServerConfig::from_env()?;
    let bind_addr = config.bind_addr;
    let frequency: Frequency = config
        .maintenance_frequency
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
        .context("Invalid BACKYARD_MAINTENANCE_FREQUENCY")?;

    let state = app::setup(config).await?;

    let scheduler = SchedulerService::new(state.maintenance_task()).await?;
    scheduler.start().await?;
    scheduler.schedule_maintenance(frequency).await?;

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await?;
    tracing::info!("Backyard server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
