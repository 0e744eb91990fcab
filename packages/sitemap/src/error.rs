//! Typed errors for the sitemap pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can decide
//! per entry whether a failure means skip or abort.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from a single resilient fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (connect, timeout, TLS)
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Every attempt ended in a retryable outcome
    #[error("gave up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },

    /// Server answered with a non-retryable, non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Client could not be constructed (bad proxy URL, TLS backend)
    #[error("HTTP client setup failed: {0}")]
    Setup(#[source] reqwest::Error),
}

/// Errors raised by the discovery, download and staging stages.
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// XML could not be parsed
    #[error("malformed XML in {source_name}: {message}")]
    Xml {
        source_name: String,
        message: String,
    },

    /// Filesystem operation failed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// NDJSON line could not be encoded or decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Index entry without a usable `loc`
    #[error("sitemap entry has no loc")]
    MissingLoc,

    /// Blocking worker panicked or was cancelled
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl SitemapError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, SitemapError>;
