//! Outbound HTTP: fetch page HTML and image bytes with timeout and retry.
//!
//! ## Retry Strategy
//!
//! Only 500/502/503/504 responses and transport failures (connection
//! resets, timeouts) are retried. Backoff doubles after every retry
//! (`retry_backoff_ms * 2^(retry-1)`), so with the defaults (300 ms, three
//! attempts) a failing request gives up after roughly one second of waiting.
//! Any other non-success status fails immediately.
//!
//! Every request carries its own timeout, passed by the caller, so the same
//! client (and its connection pool) serves both the long page fetch and the
//! short image probe.
//!
//! Page text is decoded with the charset named in `Content-Type` (UTF-8 when
//! absent), so Latin-1 and Shift_JIS recipe pages survive intact.

use crate::config::ExtractorConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Status codes worth another attempt.
pub const RETRY_STATUSES: &[u16] = &[500, 502, 503, 504];

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Always ≥ 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles afterwards.
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 300,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_ms: config.retry_backoff_ms,
        }
    }

    /// Delay to wait before `attempt` (1-indexed). Zero for the first attempt.
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u64.saturating_pow(attempt - 2);
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }

    pub fn should_retry_status(status: u16) -> bool {
        RETRY_STATUSES.contains(&status)
    }
}

/// Minimal HTTP surface the extraction core needs.
///
/// Implementations apply their own retry policy; a returned error means the
/// policy is exhausted or the failure was not retryable.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Fetch the response body as raw bytes.
    async fn fetch_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError>;

    /// Fetch the response body as text.
    ///
    /// The default decodes the bytes as UTF-8, replacing invalid sequences.
    /// [`ReqwestFetcher`] honours the response charset instead.
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        let bytes = self.fetch_bytes(url, timeout).await?;
        Ok(match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

/// Production fetcher backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl ReqwestFetcher {
    /// Build a client with the given User-Agent.
    pub fn new(user_agent: &str, policy: RetryPolicy) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client, policy })
    }

    pub fn from_config(config: &ExtractorConfig) -> Result<Self, FetchError> {
        Self::new(&config.user_agent, RetryPolicy::from_config(config))
    }

    /// One request, no retry. `Err((error, retryable))` on failure.
    async fn attempt(
        &self,
        url: &reqwest::Url,
        timeout: Duration,
        attempt: u32,
    ) -> Result<reqwest::Response, (FetchError, bool)> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| (map_reqwest_error(url.as_str(), &e, timeout), true))?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            return Err((
                FetchError::Status {
                    url: url.to_string(),
                    status: code,
                    attempts: attempt,
                },
                RetryPolicy::should_retry_status(code),
            ));
        }

        Ok(response)
    }

    /// Send with retry, then hand the successful response to `read`.
    /// A body that fails to arrive is retried like a failed send.
    async fn retrying<T, F, Fut>(&self, url: &str, timeout: Duration, read: F) -> Result<T, FetchError>
    where
        F: Fn(reqwest::Response) -> Fut,
        Fut: Future<Output = reqwest::Result<T>>,
    {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let mut last_err: Option<FetchError> = None;

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                let backoff = self.policy.backoff_before(attempt);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    url,
                    attempt - 1,
                    self.policy.max_attempts - 1,
                    backoff.as_millis()
                );
                sleep(backoff).await;
            }

            let outcome = match self.attempt(&parsed, timeout, attempt).await {
                Ok(response) => read(response)
                    .await
                    .map_err(|e| (map_reqwest_error(url, &e, timeout), true)),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(body) => {
                    debug!("{}: fetched (attempt {})", url, attempt);
                    return Ok(body);
                }
                Err((err, retryable)) => {
                    if !retryable {
                        return Err(err);
                    }
                    warn!("{}: attempt {} failed: {}", url, attempt, err);
                    last_err = Some(err);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| FetchError::Transport {
            url: url.to_string(),
            reason: "no attempts were made".to_string(),
        }))
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let bytes = self
            .retrying(url, timeout, |r| async move { r.bytes().await.map(|b| b.to_vec()) })
            .await?;
        debug!("{}: {} bytes", url, bytes.len());
        Ok(bytes)
    }

    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        self.retrying(url, timeout, |r| r.text()).await
    }
}

fn map_reqwest_error(url: &str, e: &reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            secs: timeout.as_secs(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}
