//! MarketDataAdapter implementation over the spot and futures hosts.

use crate::client::BinanceClient;
use crate::types::{RawFundingInfo, RawKline, RawOpenInterest, RawPremiumIndex, RawTicker};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use factor_pulse_core::{
    AdapterError, Candle, Exchange, FundingInfo, MarkIndex, MarketDataAdapter, TickerStats,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

/// Binance perpetuals fund every 8 hours unless `/fapi/v1/fundingInfo`
/// says otherwise.
pub const DEFAULT_FUNDING_CADENCE_HOURS: u32 = 8;

pub struct BinanceAdapter {
    client: BinanceClient,
    spot_url: String,
    futures_url: String,
}

fn parse_decimal(s: &str, field: &str) -> Result<Decimal, AdapterError> {
    Decimal::from_str(s).map_err(|e| AdapterError::Malformed(format!("{field} `{s}`: {e}")))
}

impl BinanceAdapter {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        spot_url: String,
        futures_url: String,
        rate_limit_per_minute: u32,
    ) -> Result<Self, AdapterError> {
        Ok(Self {
            client: BinanceClient::new(rate_limit_per_minute)?,
            spot_url,
            futures_url,
        })
    }

    fn candle_from_raw(symbol: &str, raw: &RawKline) -> Result<Candle, AdapterError> {
        let timestamp = Utc
            .timestamp_millis_opt(raw.open_time_ms())
            .single()
            .ok_or_else(|| {
                AdapterError::Malformed(format!("bad open time {}", raw.open_time_ms()))
            })?;
        Ok(Candle {
            timestamp,
            symbol: symbol.to_string(),
            exchange: Exchange::Binance,
            open: parse_decimal(raw.open(), "open")?,
            high: parse_decimal(raw.high(), "high")?,
            low: parse_decimal(raw.low(), "low")?,
            close: parse_decimal(raw.close(), "close")?,
            volume: parse_decimal(raw.volume(), "volume")?,
        })
    }
}

#[async_trait]
impl MarketDataAdapter for BinanceAdapter {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        limit: usize,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, AdapterError> {
        let url = format!(
            "{}/fapi/v1/klines?symbol={}&interval=1h&limit={}&endTime={}",
            self.futures_url,
            symbol,
            limit,
            end.timestamp_millis()
        );
        let raw: Vec<RawKline> = self.client.get(&url).await?;
        raw.iter()
            .map(|k| Self::candle_from_raw(symbol, k))
            .collect()
    }

    async fn fetch_funding_rate(
        &self,
        symbol: &str,
    ) -> Result<Option<FundingInfo>, AdapterError> {
        let url = format!("{}/fapi/v1/premiumIndex?symbol={}", self.futures_url, symbol);
        let raw: RawPremiumIndex = match self.client.get(&url).await {
            Ok(raw) => raw,
            Err(AdapterError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(FundingInfo {
            funding_rate: parse_decimal(&raw.last_funding_rate, "lastFundingRate")?,
            cadence_hours: DEFAULT_FUNDING_CADENCE_HOURS,
            next_funding_time: Utc.timestamp_millis_opt(raw.next_funding_time).single(),
        }))
    }

    async fn fetch_mark_index(&self, symbol: &str) -> Result<Option<MarkIndex>, AdapterError> {
        let url = format!("{}/fapi/v1/premiumIndex?symbol={}", self.futures_url, symbol);
        let raw: RawPremiumIndex = match self.client.get(&url).await {
            Ok(raw) => raw,
            Err(AdapterError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(MarkIndex {
            mark_price: parse_decimal(&raw.mark_price, "markPrice")?,
            index_price: parse_decimal(&raw.index_price, "indexPrice")?,
        }))
    }

    async fn fetch_open_interest(&self, symbol: &str) -> Result<Option<Decimal>, AdapterError> {
        let url = format!("{}/fapi/v1/openInterest?symbol={}", self.futures_url, symbol);
        let raw: RawOpenInterest = match self.client.get(&url).await {
            Ok(raw) => raw,
            Err(AdapterError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(parse_decimal(&raw.open_interest, "openInterest")?))
    }

    async fn fetch_all_tickers(&self) -> Result<Vec<TickerStats>, AdapterError> {
        let url = format!("{}/fapi/v1/ticker/24hr", self.futures_url);
        let raw: Vec<RawTicker> = self.client.get(&url).await?;
        raw.into_iter()
            .map(|t| {
                Ok(TickerStats {
                    last_price: parse_decimal(&t.last_price, "lastPrice")?,
                    quote_volume: parse_decimal(&t.quote_volume, "quoteVolume")?,
                    symbol: t.symbol,
                })
            })
            .collect()
    }

    fn degraded_limits(&self) -> bool {
        self.client.degraded_limits()
    }
}

impl BinanceAdapter {
    /// Spot 24h tickers, used to fill spot-side universe candidates.
    ///
    /// # Errors
    /// Returns an error if the request or decode fails.
    pub async fn fetch_spot_tickers(&self) -> Result<Vec<TickerStats>, AdapterError> {
        let url = format!("{}/api/v3/ticker/24hr", self.spot_url);
        let raw: Vec<RawTicker> = self.client.get(&url).await?;
        raw.into_iter()
            .map(|t| {
                Ok(TickerStats {
                    last_price: parse_decimal(&t.last_price, "lastPrice")?,
                    quote_volume: parse_decimal(&t.quote_volume, "quoteVolume")?,
                    symbol: t.symbol,
                })
            })
            .collect()
    }

    /// Funding intervals per symbol. Binance only lists symbols whose
    /// interval deviates from the 8h default, so absence means 8h.
    ///
    /// # Errors
    /// Returns an error if the request or decode fails.
    pub async fn fetch_funding_cadences(&self) -> Result<HashMap<String, u32>, AdapterError> {
        let url = format!("{}/fapi/v1/fundingInfo", self.futures_url);
        let raw: Vec<RawFundingInfo> = self.client.get(&url).await?;
        Ok(raw
            .into_iter()
            .map(|f| (f.symbol, f.funding_interval_hours))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_candle_from_raw() {
        let raw: RawKline = serde_json::from_str(
            r#"[1717243200000, "1.0", "2.0", "0.5", "1.5", "42.0",
                1717246799999, "63.0", 100, "20.0", "30.0", "0"]"#,
        )
        .unwrap();
        let candle = BinanceAdapter::candle_from_raw("XRPUSDT", &raw).unwrap();
        assert_eq!(candle.close, dec!(1.5));
        assert_eq!(candle.volume, dec!(42.0));
        assert_eq!(candle.exchange, Exchange::Binance);
        assert_eq!(candle.timestamp.timestamp_millis(), 1_717_243_200_000);
    }

    #[test]
    fn test_malformed_price_is_adapter_error() {
        let raw: RawKline = serde_json::from_str(
            r#"[1717243200000, "oops", "2.0", "0.5", "1.5", "42.0",
                1717246799999, "63.0", 100, "20.0", "30.0", "0"]"#,
        )
        .unwrap();
        let err = BinanceAdapter::candle_from_raw("XRPUSDT", &raw).unwrap_err();
        assert!(matches!(err, AdapterError::Malformed(_)));
    }
}
