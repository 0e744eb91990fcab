//! One-shot CLI for the sitemap pipeline
//!
//! Runs a single materialize or ingest pass outside the scheduler and
//! prints a JSON summary on stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ingest_core::domains::sitemaps::{ingest_listings, materialize_sitemaps, IngestReport};
use ingest_core::kernel::{run_migrations, ServerDeps};
use ingest_core::Config;

#[derive(Parser)]
#[command(name = "ingest_cli")]
#[command(about = "Hotel sitemap materialize/ingest CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover, download and stage sitemaps as NDJSON
    Materialize {
        /// Only materialize the first N child sitemaps
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Ingest batches from the staged NDJSON files
    Ingest {
        /// Maximum batches to process
        #[arg(long)]
        max_groups: Option<usize>,
    },

    /// Apply pending database migrations
    Migrate,
}

// ============================================================================
// JSON Response Types
// ============================================================================

#[derive(Serialize)]
struct Response {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<IngestReport>,
}

fn output(resp: Response) -> Result<()> {
    println!("{}", serde_json::to_string(&resp)?);
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,ingest_core=debug,sitemap_pipeline=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Materialize { limit } => {
            if limit.is_some() {
                config.materialize_limit = limit;
            }
            cmd_materialize(&config).await
        }
        Commands::Ingest { max_groups } => {
            if let Some(max_groups) = max_groups {
                config.max_groups = max_groups;
            }
            cmd_ingest(config).await
        }
        Commands::Migrate => cmd_migrate(&config).await,
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_materialize(config: &Config) -> Result<()> {
    let client = config.http_client()?;
    let files = materialize_sitemaps(config, &client).await?;

    output(Response {
        success: true,
        files: Some(files),
        report: None,
    })
}

async fn cmd_ingest(config: Config) -> Result<()> {
    let deps = ServerDeps::connect(config).await?;
    let report = ingest_listings(&deps.config, &deps.db_pool, deps.crawler.as_ref()).await?;

    output(Response {
        success: true,
        files: None,
        report: Some(report),
    })
}

async fn cmd_migrate(config: &Config) -> Result<()> {
    let pool = sqlx::PgPool::connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool).await?;

    output(Response {
        success: true,
        files: None,
        report: None,
    })
}
