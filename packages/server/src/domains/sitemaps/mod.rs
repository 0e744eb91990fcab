pub mod actions;

pub use actions::{ingest_listings, materialize_sitemaps, IngestReport};
