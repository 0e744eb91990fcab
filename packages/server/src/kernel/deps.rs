//! Server dependencies for scheduled jobs (using traits for testability)
//!
//! Built once at process start and cloned into each job. The crawler is a
//! trait object so tests can swap in [`MockPageCrawler`].
//!
//! [`MockPageCrawler`]: super::test_dependencies::MockPageCrawler

use anyhow::{Context, Result};
use sitemap_pipeline::ResilientClient;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::Config;
use crate::kernel::{BasePageCrawler, RenderServiceCrawler};

#[derive(Clone)]
pub struct ServerDeps {
    pub config: Arc<Config>,
    pub db_pool: PgPool,
    pub http: ResilientClient,
    pub crawler: Arc<dyn BasePageCrawler>,
}

impl ServerDeps {
    pub fn new(
        config: Config,
        db_pool: PgPool,
        http: ResilientClient,
        crawler: Arc<dyn BasePageCrawler>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            db_pool,
            http,
            crawler,
        }
    }

    /// Connect to the database, run migrations and build the production
    /// collaborators from `config`.
    pub async fn connect(config: Config) -> Result<Self> {
        tracing::info!("Connecting to database...");
        let db_pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("Failed to connect to database")?;
        tracing::info!("Database connected");

        run_migrations(&db_pool).await?;

        let http = config.http_client()?;
        let crawler = Arc::new(RenderServiceCrawler::new(config.crawler_url.clone())?);

        Ok(Self::new(config, db_pool, http, crawler))
    }
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");
    Ok(())
}
