//! Wire models for the Binance REST responses we consume.

use serde::Deserialize;

/// One kline row. Binance returns a positional JSON array:
/// `[openTime, open, high, low, close, volume, closeTime, quoteVolume,
///   trades, takerBuyBase, takerBuyQuote, ignore]`
/// with all prices and volumes as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct RawKline(
    pub i64,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub i64,
    pub String,
    pub u64,
    pub String,
    pub String,
    pub serde_json::Value,
);

impl RawKline {
    #[must_use]
    pub fn open_time_ms(&self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn open(&self) -> &str {
        &self.1
    }

    #[must_use]
    pub fn high(&self) -> &str {
        &self.2
    }

    #[must_use]
    pub fn low(&self) -> &str {
        &self.3
    }

    #[must_use]
    pub fn close(&self) -> &str {
        &self.4
    }

    #[must_use]
    pub fn volume(&self) -> &str {
        &self.5
    }
}

/// `/fapi/v1/premiumIndex` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPremiumIndex {
    pub symbol: String,
    pub mark_price: String,
    pub index_price: String,
    pub last_funding_rate: String,
    pub next_funding_time: i64,
}

/// `/fapi/v1/openInterest` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOpenInterest {
    pub symbol: String,
    pub open_interest: String,
}

/// One entry of a `/ticker/24hr` response (spot or futures).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTicker {
    pub symbol: String,
    pub last_price: String,
    pub quote_volume: String,
}

/// One entry of `/fapi/v1/fundingInfo`; only symbols with a non-default
/// funding interval appear here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFundingInfo {
    pub symbol: String,
    pub funding_interval_hours: u32,
}
