// Hotel listing ingestion - server core
//
// Stages booking.com hotel sitemaps as NDJSON (via sitemap-pipeline) and
// turns staged URLs into stored listings on a schedule.

pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
