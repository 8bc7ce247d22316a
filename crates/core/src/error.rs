use std::time::Duration;
use thiserror::Error;

/// Errors from market data adapters. Closed set: callers match on variants
/// to decide retry and isolation behavior, never on message strings.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Exchange rejected the request due to rate limiting.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Request timed out.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Symbol or endpoint does not exist on the exchange.
    #[error("not found: {0}")]
    NotFound(String),

    /// Response could not be parsed into the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl AdapterError {
    /// Returns true if this error is transient and worth retrying.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout(_))
    }
}

/// Fatal configuration errors, raised at startup before any I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("factor weights must sum to 1.0, got {0}")]
    WeightsSum(f64),

    #[error("invalid threshold: {0}")]
    Threshold(String),

    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// Errors from factor computation. Insufficient history is not fatal:
/// the affected fields stay null and the cycle continues.
#[derive(Debug, Error)]
pub enum FactorError {
    #[error("insufficient history: need {required} samples, have {actual}")]
    InsufficientHistory { required: usize, actual: usize },
}

/// Errors from the notification sink. Delivery failures are logged and the
/// cycle still succeeds; the dedup gate does not advance on failure.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink not configured")]
    NotConfigured,

    #[error("delivery failed: {0}")]
    Delivery(String),
}
