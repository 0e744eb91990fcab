//! Record shapes flowing between pipeline stages.

use serde::{Deserialize, Serialize};

/// One child sitemap reference from a sitemap index document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapIndexEntry {
    /// Absolute URL of the child sitemap (often `.xml.gz`)
    pub loc: String,
    pub lastmod: Option<String>,
}

impl SitemapIndexEntry {
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            lastmod: None,
        }
    }

    pub fn with_lastmod(mut self, lastmod: impl Into<String>) -> Self {
        self.lastmod = Some(lastmod.into());
        self
    }
}

/// One `<url>` entry inside a child sitemap.
///
/// Serialized as one NDJSON line: `{"loc": str, "lastmod": str|null, "changefreq": str|null}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitemapRecord {
    pub loc: String,
    #[serde(default)]
    pub lastmod: Option<String>,
    #[serde(default)]
    pub changefreq: Option<String>,
}

impl SitemapRecord {
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            lastmod: None,
            changefreq: None,
        }
    }
}

/// A fixed-size ordered group of `loc` values taken from one NDJSON file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub urls: Vec<String>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
