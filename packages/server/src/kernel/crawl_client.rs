use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{BasePageCrawler, CrawledLocation, DispatchPolicy};

/// Text the address widget appends after the location itself.
const LOCATION_TRAILERS: [&str; 2] = ["After booking", "Excellent location"];

/// Whole-dispatch timeout; a batch renders many pages.
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, thiserror::Error)]
#[error("render service returned {status}: {body}")]
pub struct RenderServiceError {
    pub status: u16,
    pub body: String,
}

#[derive(Serialize)]
struct CrawlRequest<'a> {
    urls: &'a [String],
    policy: &'a DispatchPolicy,
}

/// Render service client implementation of BasePageCrawler
///
/// POSTs `{urls, policy}` to the service and expects `[{url, location}]`.
pub struct RenderServiceCrawler {
    client: reqwest::Client,
    endpoint: String,
}

impl RenderServiceCrawler {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DISPATCH_TIMEOUT)
            .build()
            .context("Failed to create render service client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl BasePageCrawler for RenderServiceCrawler {
    async fn crawl(
        &self,
        urls: &[String],
        policy: &DispatchPolicy,
    ) -> Result<Vec<CrawledLocation>> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(&self.endpoint)
            .json(&CrawlRequest { urls, policy })
            .send()
            .await
            .context("Render service request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RenderServiceError {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let raw: Vec<CrawledLocation> = response
            .json()
            .await
            .context("Render service returned malformed JSON")?;

        let located = normalize_results(raw);
        debug!(
            requested = urls.len(),
            located = located.len(),
            "Render service dispatch complete"
        );
        Ok(located)
    }
}

/// Drop results without a usable location and clean the rest.
pub fn normalize_results(raw: Vec<CrawledLocation>) -> Vec<CrawledLocation> {
    raw.into_iter()
        .filter(|item| !item.url.is_empty())
        .filter_map(|item| {
            let location = item.location.as_deref().and_then(normalize_location)?;
            Some(CrawledLocation {
                url: item.url,
                location: Some(location),
            })
        })
        .collect()
}

/// Cut the widget trailers off a location string. Empty results are `None`.
pub fn normalize_location(raw: &str) -> Option<String> {
    let mut text = raw;
    for trailer in LOCATION_TRAILERS {
        if let Some((head, _)) = text.split_once(trailer) {
            text = head;
        }
    }

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailers() {
        assert_eq!(
            normalize_location("Damrak 1, Amsterdam After booking, all of the property's details"),
            Some("Damrak 1, Amsterdam".to_string())
        );
        assert_eq!(
            normalize_location("Keizersgracht 10 Excellent location - rated 9.4/10!"),
            Some("Keizersgracht 10".to_string())
        );
        assert_eq!(
            normalize_location("  Plain street 5  "),
            Some("Plain street 5".to_string())
        );
    }

    #[test]
    fn empty_locations_are_dropped() {
        let raw = vec![
            CrawledLocation {
                url: "https://example.com/a".into(),
                location: None,
            },
            CrawledLocation {
                url: "https://example.com/b".into(),
                location: Some("After booking, details".into()),
            },
            CrawledLocation {
                url: "https://example.com/c".into(),
                location: Some("Street 1".into()),
            },
            CrawledLocation {
                url: String::new(),
                location: Some("Street 2".into()),
            },
        ];

        assert_eq!(
            normalize_results(raw),
            vec![CrawledLocation {
                url: "https://example.com/c".into(),
                location: Some("Street 1".into()),
            }]
        );
    }

    #[tokio::test]
    async fn empty_dispatch_makes_no_request() {
        // Nothing listens on port 9; any request would fail
        let crawler = RenderServiceCrawler::new("http://127.0.0.1:9/crawl").unwrap();
        let result = crawler.crawl(&[], &DispatchPolicy::default()).await.unwrap();
        assert!(result.is_empty());
    }
}
