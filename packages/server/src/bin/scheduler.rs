// Main entry point for the sitemap ingestion scheduler

use anyhow::{Context, Result};
use ingest_core::kernel::{start_scheduler, ServerDeps};
use ingest_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,ingest_core=debug,sitemap_pipeline=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting hotel sitemap scheduler");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(sitemap_dir = %config.sitemap_dir.display(), "Configuration loaded");

    let deps = ServerDeps::connect(config).await?;

    let mut scheduler = start_scheduler(deps)
        .await
        .context("Failed to start scheduler")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutting down scheduler");
    scheduler
        .shutdown()
        .await
        .context("Failed to stop scheduler")?;

    Ok(())
}
