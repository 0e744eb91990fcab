use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::path::PathBuf;
use std::time::Duration;

use sitemap_pipeline::{HttpClientConfig, ResilientClient, RetryPolicy, DEFAULT_ROBOTS_URL};

use crate::kernel::DispatchPolicy;

pub const DEFAULT_SITEMAP_DIR: &str = "/app/sitemap_data";
pub const DEFAULT_CRAWLER_URL: &str = "http://localhost:11235/crawl";
pub const DEFAULT_ORIGIN: &str = "booking.com";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    /// Staging root; `xml/` and `ndjson/` live beneath it
    pub sitemap_dir: PathBuf,
    pub worker_threads: usize,
    /// Only materialize the first N child sitemaps when set
    pub materialize_limit: Option<usize>,
    pub group_size: usize,
    pub max_groups: usize,
    pub robots_url: String,
    pub origin: String,
    pub http_proxy_url: Option<String>,
    pub http_max_attempts: u32,
    pub http_base_backoff: Duration,
    pub crawler_url: String,
    pub crawler_max_sessions: usize,
    pub crawler_memory_threshold_percent: f64,
    pub headless: bool,
    pub materialize_cron: String,
    pub ingest_cron: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: database_url_from_env(),
            sitemap_dir: env::var("SITEMAP_DIR")
                .unwrap_or_else(|_| DEFAULT_SITEMAP_DIR.to_string())
                .into(),
            worker_threads: env_int::<usize>("SITEMAP_WORKER_THREADS", 4).max(1),
            materialize_limit: env::var("SITEMAP_MATERIALIZE_LIMIT")
                .ok()
                .and_then(|v| v.trim().parse().ok()),
            group_size: env_int::<usize>("PARALLEL_URL_TO_SCRAPE", 10).max(1),
            max_groups: env_int("SITEMAP_MAX_GROUPS", 2),
            robots_url: env::var("SITEMAP_ROBOTS_URL")
                .unwrap_or_else(|_| DEFAULT_ROBOTS_URL.to_string()),
            origin: env::var("LISTING_ORIGIN").unwrap_or_else(|_| DEFAULT_ORIGIN.to_string()),
            http_proxy_url: env::var("HTTP_PROXY_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            http_max_attempts: env_int::<u32>("HTTP_MAX_ATTEMPTS", 3).max(1),
            http_base_backoff: Duration::from_millis(env_int("HTTP_BASE_BACKOFF_MS", 1000)),
            crawler_url: env::var("CRAWLER_URL")
                .unwrap_or_else(|_| DEFAULT_CRAWLER_URL.to_string()),
            crawler_max_sessions: env_int::<usize>("CRAWLER_MAX_SESSIONS", 10).max(1),
            crawler_memory_threshold_percent: env::var("CRAWLER_MEMORY_THRESHOLD_PERCENT")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(70.0),
            headless: env_bool("PLAYWRIGHT_HEADLESS", true),
            materialize_cron: env::var("CRON_BOOKING_SITEMAP_MATERIALIZE")
                .unwrap_or_else(|_| "0 0 * * * *".to_string()),
            ingest_cron: env::var("CRON_BOOKING_SITEMAP")
                .unwrap_or_else(|_| "0 30 * * * *".to_string()),
        })
    }

    /// Defaults with an explicit database and staging root. Used by tests
    /// and tooling that do not read the environment.
    pub fn new(database_url: impl Into<String>, sitemap_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_url: database_url.into(),
            sitemap_dir: sitemap_dir.into(),
            worker_threads: 4,
            materialize_limit: None,
            group_size: 10,
            max_groups: 2,
            robots_url: DEFAULT_ROBOTS_URL.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            http_proxy_url: None,
            http_max_attempts: 3,
            http_base_backoff: Duration::from_secs(1),
            crawler_url: DEFAULT_CRAWLER_URL.to_string(),
            crawler_max_sessions: 10,
            crawler_memory_threshold_percent: 70.0,
            headless: true,
            materialize_cron: "0 0 * * * *".to_string(),
            ingest_cron: "0 30 * * * *".to_string(),
        }
    }

    /// Build the shared fetch client. Fails on a proxy URL reqwest rejects.
    pub fn http_client(&self) -> Result<ResilientClient> {
        ResilientClient::new(HttpClientConfig {
            proxy: self.http_proxy_url.clone(),
            retry: RetryPolicy::new(self.http_max_attempts, self.http_base_backoff),
            ..Default::default()
        })
        .context("Failed to build HTTP client")
    }

    pub fn dispatch_policy(&self) -> DispatchPolicy {
        DispatchPolicy {
            max_sessions: self.crawler_max_sessions,
            memory_threshold_percent: self.crawler_memory_threshold_percent,
            headless: self.headless,
        }
    }
}

fn database_url_from_env() -> String {
    if let Ok(url) = env::var("DATABASE_URL") {
        return url;
    }

    let user = env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string());
    let password = env::var("DB_PASSWORD")
        .or_else(|_| env::var("POSTGRES_DB_PASSWORD"))
        .unwrap_or_default();
    let host = env::var("DB_HOST").unwrap_or_else(|_| "db".to_string());
    let port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
    let name = env::var("DB_NAME")
        .or_else(|_| env::var("POSTGRES_DB"))
        .unwrap_or_else(|_| "db".to_string());

    format!("postgresql://{}:{}@{}:{}/{}", user, password, host, port, name)
}

/// Integer knob; unset, malformed or out-of-range values use the default.
fn env_int<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => parse_bool(&v),
        Err(_) => default,
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
