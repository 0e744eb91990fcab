//! Discover, download and stage hotel sitemaps as NDJSON.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use sitemap_pipeline::{
    Downloader, IndexParser, IndexResolver, Materializer, ResilientClient, StagingDirs,
};

use crate::config::Config;

/// Run discovery through staging and return the NDJSON files written.
///
/// Only a staging directory that cannot be created, or a robots.txt/index
/// fetch that fails outright, is an error. A child sitemap that fails to
/// download or parse is logged and skipped.
pub async fn materialize_sitemaps(config: &Config, client: &ResilientClient) -> Result<Vec<PathBuf>> {
    let dirs = StagingDirs::prepare(&config.sitemap_dir)
        .context("Failed to prepare sitemap staging directories")?;
    debug!(root = %dirs.root.display(), "Using sitemap directory");

    let index_url = IndexResolver::new(client.clone(), config.robots_url.clone())
        .resolve_index()
        .await
        .context("Failed to read sitemaps from robots.txt")?;

    let Some(index_url) = index_url else {
        warn!(robots_url = %config.robots_url, "No hotel sitemap index found");
        return Ok(Vec::new());
    };

    let mut entries = IndexParser::new(client.clone())
        .list_entries(&index_url)
        .await
        .context("Failed to fetch sitemap index")?;

    if entries.is_empty() {
        info!(index_url = %index_url, "No en-us sitemap entries discovered");
        return Ok(Vec::new());
    }

    if let Some(limit) = config.materialize_limit.filter(|limit| *limit > 0) {
        entries.truncate(limit);
    }

    let xml_paths: Vec<PathBuf> = Downloader::new(client.clone())
        .download_all(&entries, &dirs.xml, config.worker_threads)
        .await
        .into_iter()
        .filter_map(|(_, result)| result.ok())
        .collect();

    let ndjson_paths: Vec<PathBuf> = Materializer::new(&dirs.ndjson)
        .materialize_all(xml_paths, config.worker_threads)
        .await
        .into_iter()
        .filter_map(|(_, result)| result.ok())
        .collect();

    info!(
        entries = entries.len(),
        materialized = ndjson_paths.len(),
        "Materialized sitemap files to NDJSON"
    );
    Ok(ndjson_paths)
}
