use crate::error::{AdapterError, SinkError};
use crate::types::{Candle, Exchange, FundingInfo, MarkIndex, TickerStats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Capability interface over one exchange's market data endpoints.
///
/// Implementations own their rate limiting and retry policy; callers only
/// see the closed [`AdapterError`] set and can isolate per-symbol failures.
#[async_trait]
pub trait MarketDataAdapter: Send + Sync {
    fn exchange(&self) -> Exchange;

    /// Fetches up to `limit` hourly candles ending now, oldest first.
    async fn fetch_candles(
        &self,
        symbol: &str,
        limit: usize,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, AdapterError>;

    /// Fetches the current funding rate for a perpetual, or `None` for
    /// spot-only symbols.
    async fn fetch_funding_rate(&self, symbol: &str)
        -> Result<Option<FundingInfo>, AdapterError>;

    /// Fetches mark/index prices, or `None` for spot-only symbols.
    async fn fetch_mark_index(&self, symbol: &str) -> Result<Option<MarkIndex>, AdapterError>;

    /// Fetches open interest, or `None` for spot-only symbols.
    async fn fetch_open_interest(&self, symbol: &str) -> Result<Option<Decimal>, AdapterError>;

    /// Fetches 24h ticker statistics for every symbol on the exchange,
    /// used for universe ranking.
    async fn fetch_all_tickers(&self) -> Result<Vec<TickerStats>, AdapterError>;

    /// True when the adapter has recently been rate limited and callers
    /// should expect degraded throughput.
    fn degraded_limits(&self) -> bool;
}

/// Delivery channel for rendered digests.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sends a text digest. A failure is logged by the caller and must not
    /// advance the dedup gate's last-sent hash.
    async fn send(&self, text: &str) -> Result<(), SinkError>;

    fn is_configured(&self) -> bool;
}
