use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Supported exchanges as a closed set.
///
/// Adding an exchange means adding a variant here and an adapter crate,
/// never string-branching on response shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    Binance,
}

impl Exchange {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Binance => "binance",
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single OHLCV candle as returned by an exchange adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub exchange: Exchange,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Funding rate information for a perpetual contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingInfo {
    /// The per-period funding rate as a fraction (0.0001 = 0.01%).
    pub funding_rate: Decimal,
    /// Hours between funding payments (8 on Binance perpetuals).
    pub cadence_hours: u32,
    pub next_funding_time: Option<DateTime<Utc>>,
}

/// Mark and index price pair for a futures contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkIndex {
    pub mark_price: Decimal,
    pub index_price: Decimal,
}

/// 24h ticker statistics used for universe ranking and volume fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerStats {
    pub symbol: String,
    pub last_price: Decimal,
    /// 24h quote volume.
    pub quote_volume: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_as_str() {
        assert_eq!(Exchange::Binance.as_str(), "binance");
        assert_eq!(Exchange::Binance.to_string(), "binance");
    }

    #[test]
    fn test_exchange_serde_lowercase() {
        let json = serde_json::to_string(&Exchange::Binance).unwrap();
        assert_eq!(json, "\"binance\"");
        let back: Exchange = serde_json::from_str("\"binance\"").unwrap();
        assert_eq!(back, Exchange::Binance);
    }
}
