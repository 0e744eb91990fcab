//! Batch staged sitemap URLs, skip known listings, crawl the rest and store
//! what the render service located.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use std::path::PathBuf;
use tracing::{debug, info};

use sitemap_pipeline::{Batch, Batches, StagingDirs};

use crate::config::Config;
use crate::domains::listings::{HotelListing, NewHotelListing};
use crate::kernel::BasePageCrawler;

/// What one ingest run did. Returned for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Staged file the batches came from
    pub file: Option<PathBuf>,
    pub batches: usize,
    /// URLs skipped because they were already stored
    pub skipped_known: usize,
    /// URLs sent to the crawler
    pub crawled: usize,
    pub inserted: u64,
}

/// Process up to `config.max_groups` batches from the first staged file
/// that yields a full batch, then stop.
pub async fn ingest_listings(
    config: &Config,
    pool: &PgPool,
    crawler: &dyn BasePageCrawler,
) -> Result<IngestReport> {
    let dirs = StagingDirs::new(&config.sitemap_dir);
    let files = dirs
        .ndjson_files()
        .context("Failed to list staged NDJSON files")?;

    let mut report = IngestReport::default();

    for path in files {
        let mut batches = Batches::open(&path, config.group_size, config.max_groups)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let Some(first) = batches.next() else {
            debug!(path = %path.display(), "No full batch in staged file");
            continue;
        };

        info!(path = %path.display(), "Ingesting staged sitemap");
        report.file = Some(path.clone());

        for batch in std::iter::once(first).chain(batches) {
            let batch = batch.with_context(|| format!("Failed to read {}", path.display()))?;
            ingest_batch(&batch, config, pool, crawler, &mut report).await?;
        }
        break;
    }

    info!(
        batches = report.batches,
        skipped_known = report.skipped_known,
        crawled = report.crawled,
        inserted = report.inserted,
        "Ingest run complete"
    );
    Ok(report)
}

async fn ingest_batch(
    batch: &Batch,
    config: &Config,
    pool: &PgPool,
    crawler: &dyn BasePageCrawler,
    report: &mut IngestReport,
) -> Result<()> {
    report.batches += 1;

    let unknown = HotelListing::filter_unknown(&batch.urls, &config.origin, pool)
        .await
        .context("Dedup query failed")?;
    report.skipped_known += batch.len() - unknown.len();

    if unknown.is_empty() {
        debug!(batch = report.batches, "Every URL in batch already stored");
        return Ok(());
    }

    report.crawled += unknown.len();
    let crawled = crawler
        .crawl(&unknown, &config.dispatch_policy())
        .await
        .context("Crawl dispatch failed")?;

    if crawled.is_empty() {
        debug!(batch = report.batches, "Crawler located no listings");
        return Ok(());
    }

    let today = Utc::now().date_naive();
    let rows: Vec<NewHotelListing> = crawled
        .into_iter()
        .map(|item| NewHotelListing {
            hotel_url: item.url,
            location: item.location,
            lastmod: Some(today),
            origin: config.origin.clone(),
        })
        .collect();

    let inserted = HotelListing::bulk_upsert(&rows, pool)
        .await
        .context("Listing upsert failed")?;
    report.inserted += inserted;

    if inserted > 0 {
        let urls: Vec<&str> = rows.iter().map(|r| r.hotel_url.as_str()).collect();
        info!(count = inserted, urls = ?urls, "Inserted hotel listings");
    }

    Ok(())
}
