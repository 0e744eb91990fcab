//! Child sitemap downloader.
//!
//! Files are always persisted decompressed, written to a hidden `.part`
//! sibling first and renamed into place so the parser never sees a
//! half-written file under its final name.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use url::Url;

use crate::error::{Result, SitemapError};
use crate::gzip::{decompress_if_gzip, is_gzip};
use crate::http::ResilientClient;
use crate::types::SitemapIndexEntry;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Local filename for a child sitemap URL: the last path segment with any
/// `.gz` suffix removed.
pub fn local_filename(loc: &str) -> Result<String> {
    let last_segment = match Url::parse(loc) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => loc.rsplit('/').next().map(str::to_string),
    };

    let name = last_segment.unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);

    if name.is_empty() || name == "." || name == ".." {
        return Err(SitemapError::MissingLoc);
    }

    Ok(name.to_string())
}

/// Write `bytes` to `dest` via a temporary sibling and an atomic rename.
pub async fn write_atomically(dest: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = dest.with_file_name(format!(".{}.part", file_name));

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| SitemapError::io(&tmp, e))?;

    if let Err(e) = tokio::fs::rename(&tmp, dest).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(SitemapError::io(dest, e));
    }

    Ok(())
}

/// Downloads child sitemaps into the XML staging directory.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: ResilientClient,
    timeout: Duration,
}

impl Downloader {
    pub fn new(client: ResilientClient) -> Self {
        Self {
            client,
            timeout: DOWNLOAD_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Download one child sitemap and return its local, decompressed path.
    pub async fn download(&self, entry: &SitemapIndexEntry, dest_dir: &Path) -> Result<PathBuf> {
        let loc = entry.loc.trim();
        if loc.is_empty() {
            return Err(SitemapError::MissingLoc);
        }

        let dest = dest_dir.join(local_filename(loc)?);

        tokio::fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| SitemapError::io(dest_dir, e))?;

        let response = self.client.fetch(loc, self.timeout).await?.error_for_status()?;
        let gzip = is_gzip(loc, response.content_type());
        let body = response.body;

        let payload = tokio::task::spawn_blocking(move || decompress_if_gzip(body, gzip)).await?;

        write_atomically(&dest, &payload).await?;

        info!(path = %dest.display(), bytes = payload.len(), "Saved sitemap XML");
        Ok(dest)
    }

    /// Download every entry with at most `workers` requests in flight.
    ///
    /// Results come back in input order; one entry failing does not stop
    /// the others.
    pub async fn download_all(
        &self,
        entries: &[SitemapIndexEntry],
        dest_dir: &Path,
        workers: usize,
    ) -> Vec<(SitemapIndexEntry, Result<PathBuf>)> {
        stream::iter(entries.iter().cloned())
            .map(|entry| async move {
                let result = self.download(&entry, dest_dir).await;
                if let Err(e) = &result {
                    warn!(url = %entry.loc, error = %e, "Sitemap download failed");
                }
                (entry, result)
            })
            .buffered(workers.max(1))
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_gz_suffix() {
        assert_eq!(
            local_filename("https://example.com/sitembk-hotel-en-us.0000.xml.gz").unwrap(),
            "sitembk-hotel-en-us.0000.xml"
        );
    }

    #[test]
    fn keeps_plain_names() {
        assert_eq!(
            local_filename("https://example.com/maps/hotels.xml?v=2").unwrap(),
            "hotels.xml"
        );
    }

    #[test]
    fn rejects_urls_without_a_file_name() {
        assert!(matches!(
            local_filename("https://example.com/"),
            Err(SitemapError::MissingLoc)
        ));
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.xml");

        write_atomically(&dest, b"<urlset/>").await.unwrap();
        write_atomically(&dest, b"<urlset></urlset>").await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"<urlset></urlset>");
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }
}
