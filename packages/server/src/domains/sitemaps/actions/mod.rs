//! Sitemap domain actions - the two externally triggered operations
//!
//! `materialize_sitemaps()` stages NDJSON from the live sitemaps;
//! `ingest_listings()` turns staged URLs into stored listings. They share
//! nothing but the staging directory and run on independent schedules.

pub mod ingest;
pub mod materialize;

pub use ingest::{ingest_listings, IngestReport};
pub use materialize::materialize_sitemaps;
