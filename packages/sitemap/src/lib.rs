//! Sitemap discovery and staging pipeline
//!
//! Finds the hotel sitemap index through robots.txt, downloads the child
//! sitemaps, stream-parses them and stages one NDJSON file per sitemap so a
//! later run can batch the URLs without touching the network again.
//!
//! ```text
//! robots.txt ─► IndexResolver ─► IndexParser ─► Downloader ─► <root>/xml/*.xml
//!                                                                  │
//!                                            SitemapRecords ◄──────┘
//!                                                  │
//!                                            Materializer ─► <root>/ndjson/*.ndjson ─► Batches
//! ```
//!
//! # Modules
//!
//! - [`http`] - Fetch primitive with bounded retries and backoff
//! - [`robots`] - robots.txt sitemap extraction and index selection
//! - [`index`] - Sitemap index parsing and locale filtering
//! - [`download`] - Child sitemap download with a bounded worker pool
//! - [`stream`] - Constant-memory `<urlset>` parser
//! - [`materialize`] - NDJSON staging
//! - [`batch`] - Fixed-width batching over staged files

pub mod batch;
pub mod download;
pub mod error;
pub mod gzip;
pub mod http;
pub mod index;
pub mod materialize;
pub mod robots;
pub mod staging;
pub mod stream;
pub mod types;

pub use batch::{iterate, Batches};
pub use download::{local_filename, Downloader};
pub use error::{FetchError, FetchResult, Result, SitemapError};
pub use http::{FetchOutcome, FetchResponse, HttpClientConfig, ResilientClient, RetryPolicy};
pub use index::{filter_locale, parse_index_xml, IndexParser, DEFAULT_LOCALE};
pub use materialize::Materializer;
pub use robots::{IndexResolver, IndexSelector, RobotsTxt, DEFAULT_ROBOTS_URL};
pub use staging::StagingDirs;
pub use stream::SitemapRecords;
pub use types::{Batch, SitemapIndexEntry, SitemapRecord};
