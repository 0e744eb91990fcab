//! Resilient HTTP fetch primitive.
//!
//! Every network-touching stage goes through [`ResilientClient::fetch`]. Each
//! attempt is classified into a [`FetchOutcome`], and the retry loop is a plain
//! state machine over those outcomes:
//!
//! ```text
//! attempt ──► Final(response)  ──► return Ok (any non-retryable status)
//!        ├──► Fatal(error)     ──► return Err
//!        └──► Retryable        ──► sleep(backoff) ──► attempt (until ceiling)
//!                                                └──► Err(RetriesExhausted)
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};

/// Statuses that trigger another attempt.
pub const RETRYABLE_STATUSES: [u16; 6] = [202, 429, 500, 502, 503, 504];

/// Browser-like agent; the upstream site serves robots and sitemaps to it.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Retry ceiling and backoff base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (min 1)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after that
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// A numeric `Retry-After` raises the floor but never shortens the
    /// exponential delay.
    pub fn backoff_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let computed = self.base_backoff.saturating_mul(1u32 << exponent);
        match retry_after {
            Some(floor) => computed.max(floor),
            None => computed,
        }
    }
}

/// Client-wide settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub user_agent: String,
    /// Upstream HTTP/HTTPS proxy applied to every request
    pub proxy: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// A completed response with its body fully read.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx final response into [`FetchError::Status`].
    pub fn error_for_status(self) -> FetchResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FetchError::Status {
                url: self.url,
                status: self.status,
            })
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Classification of one attempt.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Final answer: success or a status outside the retryable set
    Final(FetchResponse),
    /// Worth another attempt
    Retryable {
        reason: String,
        retry_after: Option<Duration>,
    },
    /// Retrying cannot help (malformed request)
    Fatal(FetchError),
}

/// HTTP client with bounded retries, exponential backoff and `Retry-After`.
#[derive(Debug, Clone)]
pub struct ResilientClient {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ResilientClient {
    pub fn new(config: HttpClientConfig) -> FetchResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent);

        if let Some(proxy) = config.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy).map_err(FetchError::Setup)?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(FetchError::Setup)?;

        Ok(Self {
            client,
            retry: RetryPolicy::new(config.retry.max_attempts, config.retry.base_backoff),
        })
    }

    /// Fetch `url`, retrying transient failures up to the attempt ceiling.
    pub async fn fetch(&self, url: &str, timeout: Duration) -> FetchResult<FetchResponse> {
        let max_attempts = self.retry.max_attempts;
        let mut last_reason = String::new();

        for attempt in 1..=max_attempts {
            match self.attempt(url, timeout).await {
                FetchOutcome::Final(response) => {
                    debug!(url = %url, status = response.status, attempt, "Fetch complete");
                    return Ok(response);
                }
                FetchOutcome::Fatal(error) => return Err(error),
                FetchOutcome::Retryable {
                    reason,
                    retry_after,
                } => {
                    if attempt < max_attempts {
                        let delay = self.retry.backoff_for(attempt, retry_after);
                        warn!(
                            url = %url,
                            attempt,
                            max_attempts,
                            reason = %reason,
                            delay_ms = delay.as_millis() as u64,
                            "Retryable fetch failure, backing off"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_reason = reason;
                }
            }
        }

        warn!(url = %url, attempts = max_attempts, reason = %last_reason, "Fetch retries exhausted");
        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts: max_attempts,
            last: last_reason,
        })
    }

    /// Perform exactly one request and classify it.
    pub async fn attempt(&self, url: &str, timeout: Duration) -> FetchOutcome {
        let response = match self.client.get(url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                return FetchOutcome::Fatal(FetchError::Transport {
                    url: url.to_string(),
                    source: e,
                })
            }
            Err(e) => {
                return FetchOutcome::Retryable {
                    reason: e.to_string(),
                    retry_after: None,
                }
            }
        };

        let status = response.status().as_u16();
        if RETRYABLE_STATUSES.contains(&status) {
            return FetchOutcome::Retryable {
                reason: format!("HTTP {}", status),
                retry_after: parse_retry_after(response.headers()),
            };
        }

        let headers = response.headers().clone();
        match response.bytes().await {
            Ok(body) => FetchOutcome::Final(FetchResponse {
                url: url.to_string(),
                status,
                headers,
                body: body.to_vec(),
            }),
            Err(e) => FetchOutcome::Retryable {
                reason: format!("body read failed: {}", e),
                retry_after: None,
            },
        }
    }
}

/// Numeric `Retry-After` in seconds. HTTP-date values are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn backoff_doubles_from_base() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(1, None), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2, None), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(3, None), Duration::from_secs(4));
    }

    #[test]
    fn retry_after_raises_the_floor() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.backoff_for(1, Some(Duration::from_secs(7))),
            Duration::from_secs(7)
        );
        // Shorter hint than the computed delay keeps the computed delay
        assert_eq!(
            policy.backoff_for(3, Some(Duration::from_secs(1))),
            Duration::from_secs(4)
        );
    }

    #[test]
    fn zero_attempts_is_coerced_to_one() {
        let policy = RetryPolicy::new(0, Duration::from_millis(5));
        assert_eq!(policy.max_attempts, 1);
    }

    #[test]
    fn parses_numeric_retry_after_only() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("12"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn retryable_set_excludes_not_found() {
        assert!(RETRYABLE_STATUSES.contains(&503));
        assert!(RETRYABLE_STATUSES.contains(&202));
        assert!(!RETRYABLE_STATUSES.contains(&404));
        assert!(!RETRYABLE_STATUSES.contains(&200));
    }

    #[test]
    fn bad_proxy_is_a_setup_error() {
        let config = HttpClientConfig {
            proxy: Some("not a proxy url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ResilientClient::new(config),
            Err(FetchError::Setup(_))
        ));
    }
}
