//! robots.txt sitemap discovery and hotel index selection.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::Result;
use crate::http::ResilientClient;

/// Default robots.txt location for the upstream site.
pub const DEFAULT_ROBOTS_URL: &str = "https://www.booking.com/robots.txt";

const ROBOTS_TIMEOUT: Duration = Duration::from_secs(15);

/// Sitemap declarations from a robots.txt body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsTxt {
    sitemaps: Vec<String>,
}

impl RobotsTxt {
    /// Parse robots.txt content, keeping only `Sitemap:` directives.
    ///
    /// The directive name is matched case-insensitively and the value must
    /// be a single whitespace-free token. Source order is preserved.
    pub fn parse(content: &str) -> Self {
        let mut robots = Self::default();

        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((directive, value)) = line.split_once(':') else {
                continue;
            };

            if !directive.trim_end().eq_ignore_ascii_case("sitemap") {
                continue;
            }

            let value = value.trim();
            if !value.is_empty() && !value.contains(char::is_whitespace) {
                robots.sitemaps.push(value.to_string());
            }
        }

        robots
    }

    /// Get listed sitemaps.
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }
}

/// Markers used to pick the canonical hotel index among robots candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSelector {
    /// Locale marker for the first-tier choice
    pub preferred_locale: String,
    /// Family marker for the fallback tier
    pub family: String,
}

impl Default for IndexSelector {
    fn default() -> Self {
        Self {
            preferred_locale: "-nl".to_string(),
            family: "hotel".to_string(),
        }
    }
}

impl IndexSelector {
    /// Deterministic two-tier selection: the first candidate carrying the
    /// locale marker and `index`, else the first carrying the family marker
    /// and `index`.
    pub fn select<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        let is_index = |c: &&String| c.contains("index");

        candidates
            .iter()
            .filter(is_index)
            .find(|c| c.contains(self.preferred_locale.as_str()))
            .or_else(|| {
                candidates
                    .iter()
                    .filter(is_index)
                    .find(|c| c.contains(self.family.as_str()))
            })
            .map(String::as_str)
    }
}

/// Resolves the hotel sitemap index URL from robots.txt.
#[derive(Debug, Clone)]
pub struct IndexResolver {
    client: ResilientClient,
    robots_url: String,
    selector: IndexSelector,
}

impl IndexResolver {
    pub fn new(client: ResilientClient, robots_url: impl Into<String>) -> Self {
        Self {
            client,
            robots_url: robots_url.into(),
            selector: IndexSelector::default(),
        }
    }

    pub fn with_selector(mut self, selector: IndexSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Fetch robots.txt and return every declared sitemap URL.
    pub async fn fetch_sitemaps(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .fetch(&self.robots_url, ROBOTS_TIMEOUT)
            .await?
            .error_for_status()?;

        let robots = RobotsTxt::parse(&response.text());
        debug!(
            robots_url = %self.robots_url,
            count = robots.sitemaps().len(),
            "Parsed robots.txt sitemap declarations"
        );
        Ok(robots.sitemaps)
    }

    /// `Ok(None)` means robots.txt declared no matching index.
    pub async fn resolve_index(&self) -> Result<Option<String>> {
        let candidates = self.fetch_sitemaps().await?;
        let chosen = self.selector.select(&candidates).map(str::to_string);

        match &chosen {
            Some(url) => info!(index_url = %url, "Selected hotel sitemap index"),
            None => info!(
                candidates = candidates.len(),
                "No hotel sitemap index among robots.txt sitemaps"
            ),
        }

        Ok(chosen)
    }
}
