//! Plain-HTTP implementation of [`RenderProvider`].

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use url::Url;

use crate::{provider::RenderProvider, user_agent::get_user_agent, Error};

/// Retry and backoff settings for [`Client`].
#[derive(Clone, Debug)]
pub struct FetchConfig {
    /// Extra attempts after the first one fails with a retryable error.
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 600,
            max_delay_ms: 30_000,
        }
    }
}

impl FetchConfig {
    /// Defaults with `max_retries` set, and backoff timings overridable through
    /// `MARKETSCOUT_RETRY_BASE_MS` / `MARKETSCOUT_RETRY_MAX_MS`.
    pub fn from_env(max_retries: usize) -> Self {
        let defaults = Self::default();
        Self {
            max_retries,
            base_delay_ms: env_u64("MARKETSCOUT_RETRY_BASE_MS", defaults.base_delay_ms),
            max_delay_ms: env_u64("MARKETSCOUT_RETRY_MAX_MS", defaults.max_delay_ms),
        }
    }

    fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(30) as u32;
        let exp = 1u64 << shift;
        let base = self
            .base_delay_ms
            .saturating_mul(exp)
            .min(self.max_delay_ms);
        let jitter = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_millis((base as f64 * jitter) as u64)
    }
}

/// Fetches marketplace pages over plain HTTP.
///
/// Sends browser-like headers and a randomized user agent. A fresh
/// `reqwest::Client` is built for every fetch, so nothing (cookies,
/// connections) leaks from one page to the next.
#[derive(Default)]
pub struct Client {
    config: FetchConfig,
}

impl Client {
    pub fn new(config: FetchConfig) -> Self {
        Self { config }
    }

    /// Fetches `url`, retrying transport errors and 429/5xx responses with
    /// exponential backoff.
    pub async fn fetch_html(&self, url: &str, timeout: Duration) -> Result<String, Error> {
        let url = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
        let mut attempt = 0usize;
        loop {
            match self.fetch_once(&url, timeout).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    attempt += 1;
                    if attempt > self.config.max_retries || !err.is_retryable() {
                        return Err(err);
                    }
                    let delay = self.config.delay_for_attempt(attempt);
                    tracing::warn!(
                        "fetch of {} failed (attempt {}/{}): {}, retrying in {:.1}s",
                        url,
                        attempt,
                        self.config.max_retries,
                        err,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn fetch_once(&self, url: &Url, timeout: Duration) -> Result<String, Error> {
        let client = reqwest::Client::builder()
            .user_agent(get_user_agent())
            .timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::RequestFailed(e.to_string())
            })?;
        let resp = client
            .get(url.clone())
            .header("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("accept-language", "en-US,en;q=0.9")
            .header("upgrade-insecure-requests", "1")
            .header("cache-control", "no-cache")
            .header("pragma", "no-cache")
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl RenderProvider for Client {
    async fn fetch_rendered(&self, url: &str, timeout: Duration) -> Result<String, Error> {
        self.fetch_html(url, timeout).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &body[..end])
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
