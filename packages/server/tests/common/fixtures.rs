//! Test fixtures for creating test data.
//!
//! These fixtures use the model methods directly to create test data.

use anyhow::Result;
use chrono::NaiveDate;
use ingest_core::domains::listings::{HotelListing, NewHotelListing};
use sitemap_pipeline::SitemapRecord;
use sqlx::PgPool;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn listing(url: &str, origin: &str) -> NewHotelListing {
    NewHotelListing {
        hotel_url: url.to_string(),
        location: Some(format!("Location of {}", url)),
        lastmod: NaiveDate::from_ymd_opt(2024, 1, 1),
        origin: origin.to_string(),
    }
}

/// Store one listing per URL for `origin`
pub async fn seed_listings(urls: &[&str], origin: &str, pool: &PgPool) -> Result<u64> {
    let rows: Vec<_> = urls.iter().map(|url| listing(url, origin)).collect();
    HotelListing::bulk_upsert(&rows, pool).await
}

pub fn hotel_urls(prefix: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("https://www.booking.com/hotel/nl/{}-{}.html", prefix, i))
        .collect()
}

/// Write `urls` as a staged NDJSON file under `<root>/ndjson/<name>`.
pub fn stage_ndjson(root: &Path, name: &str, urls: &[String]) -> Result<PathBuf> {
    let dir = root.join("ndjson");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join(name);

    let mut file = std::fs::File::create(&path)?;
    for url in urls {
        let record = SitemapRecord::new(url.clone());
        writeln!(file, "{}", serde_json::to_string(&record)?)?;
    }
    file.flush()?;
    Ok(path)
}
