// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ingest runs for tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{BasePageCrawler, CrawledLocation, DispatchPolicy};

// =============================================================================
// Mock Page Crawler
// =============================================================================

/// Arguments captured from a crawl call
#[derive(Debug, Clone)]
pub struct CrawlCallArgs {
    pub urls: Vec<String>,
    pub policy: DispatchPolicy,
}

/// Returns a canned location for every URL it knows; unknown URLs are
/// treated as render failures and left out of the result.
#[derive(Clone, Default)]
pub struct MockPageCrawler {
    locations: Arc<Mutex<HashMap<String, String>>>,
    fail_all: bool,
    calls: Arc<Mutex<Vec<CrawlCallArgs>>>,
}

impl MockPageCrawler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate every URL as `"<prefix> <url>"`.
    pub fn locating_all(self, urls: &[String], prefix: &str) -> Self {
        {
            let mut locations = self.locations.lock().unwrap();
            for url in urls {
                locations.insert(url.clone(), format!("{} {}", prefix, url));
            }
        }
        self
    }

    /// Every dispatch fails as a whole.
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub fn calls(&self) -> Vec<CrawlCallArgs> {
        self.calls.lock().unwrap().clone()
    }

    /// Every URL dispatched so far, in dispatch order.
    pub fn crawled_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .flat_map(|call| call.urls.clone())
            .collect()
    }
}

#[async_trait]
impl BasePageCrawler for MockPageCrawler {
    async fn crawl(
        &self,
        urls: &[String],
        policy: &DispatchPolicy,
    ) -> Result<Vec<CrawledLocation>> {
        self.calls.lock().unwrap().push(CrawlCallArgs {
            urls: urls.to_vec(),
            policy: policy.clone(),
        });

        if self.fail_all {
            anyhow::bail!("mock render service unavailable");
        }

        let locations = self.locations.lock().unwrap();
        Ok(urls
            .iter()
            .filter_map(|url| {
                locations.get(url).map(|location| CrawledLocation {
                    url: url.clone(),
                    location: Some(location.clone()),
                })
            })
            .collect())
    }
}
