// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Naming convention: Base* for trait names (e.g., BasePageCrawler)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// =============================================================================
// Page Crawler Trait (Infrastructure - headless rendering + extraction)
// =============================================================================

/// Limits forwarded to the rendering collaborator with every dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchPolicy {
    /// Concurrent browser sessions ceiling
    pub max_sessions: usize,
    /// Stop opening sessions above this host memory utilization
    pub memory_threshold_percent: f64,
    pub headless: bool,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            max_sessions: 10,
            memory_threshold_percent: 70.0,
            headless: true,
        }
    }
}

/// A rendered page whose address block matched the extraction schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawledLocation {
    pub url: String,
    pub location: Option<String>,
}

#[async_trait]
pub trait BasePageCrawler: Send + Sync {
    /// Render `urls` and extract their location text.
    ///
    /// Pages that fail to render are absent from the result; only a failure
    /// of the whole dispatch is an error.
    async fn crawl(&self, urls: &[String], policy: &DispatchPolicy)
        -> Result<Vec<CrawledLocation>>;
}
