//! Rate-limited HTTP client shared by the spot and futures endpoints.

use factor_pulse_core::AdapterError;
use governor::clock::DefaultClock;
use governor::state::{direct::NotKeyed, InMemoryState};
use governor::{Quota, RateLimiter};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 3;
const BASE_RETRY_DELAY: Duration = Duration::from_millis(100);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct BinanceClient {
    http: reqwest::Client,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    /// Set once the exchange has rate limited us during this process;
    /// surfaced so the pipeline can note degraded throughput.
    degraded: AtomicBool,
}

impl BinanceClient {
    /// Builds a client with a request budget of `rate_limit_per_minute`,
    /// spread evenly per second.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(rate_limit_per_minute: u32) -> Result<Self, AdapterError> {
        let per_second = (rate_limit_per_minute / 60).max(1);
        let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| AdapterError::Malformed(format!("http client: {e}")))?;

        Ok(Self {
            http,
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            degraded: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn degraded_limits(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// GET with rate limiting, timeout, and bounded exponential backoff.
    /// Only retryable errors (rate limit, timeout) are retried.
    ///
    /// # Errors
    /// Returns the last `AdapterError` after retries are exhausted.
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, AdapterError> {
        let mut delay = BASE_RETRY_DELAY;
        let mut last_err = None;

        for attempt in 0..=DEFAULT_MAX_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_RETRY_DELAY);
            }
            self.rate_limiter.until_ready().await;
            debug!(url, attempt, "GET");

            match self.get_once(url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    warn!(url, attempt, error = %e, "Retryable request failure");
                    if let AdapterError::RateLimited { retry_after_ms } = &e {
                        delay = delay.max(Duration::from_millis(*retry_after_ms));
                    }
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| AdapterError::Timeout(DEFAULT_TIMEOUT)))
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &str) -> Result<T, AdapterError> {
        let response = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AdapterError::Timeout(DEFAULT_TIMEOUT)
            } else {
                AdapterError::Malformed(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();

        if status.as_u16() == 429 || status.as_u16() == 418 {
            self.degraded.store(true, Ordering::Relaxed);
            let retry_after_ms = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map_or(60_000, |secs| secs * 1000);
            return Err(AdapterError::RateLimited { retry_after_ms });
        }

        if status.as_u16() == 404 {
            return Err(AdapterError::NotFound(url.to_string()));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AdapterError::Malformed(format!(
                "status {status}: {text}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AdapterError::Malformed(format!("decode failed: {e}")))
    }
}
