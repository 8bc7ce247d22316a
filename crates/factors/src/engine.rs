//! Assembles a FactorRecord from a symbol's window plus the benchmark's.

use crate::composite::{self, SubFactors};
use crate::window::SnapshotWindow;
use crate::{carry, mean_reversion, momentum, volume};
use chrono::{DateTime, Utc};
use factor_pulse_core::config::{FactorWeights, Thresholds};
use factor_pulse_core::FactorError;
use factor_pulse_data::FactorRecord;
use rust_decimal::prelude::ToPrimitive;

pub struct FactorEngine {
    weights: FactorWeights,
    thresholds: Thresholds,
}

impl FactorEngine {
    #[must_use]
    pub fn new(weights: FactorWeights, thresholds: Thresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    /// Computes all factors for one symbol at the window's newest hour.
    ///
    /// Momentum and mean-reversion run on the benchmark-relative price
    /// series so market-wide moves cancel; volume and carry are absolute.
    /// Individually uncomputable factors stay `None`.
    ///
    /// # Errors
    /// Returns `FactorError::InsufficientHistory` when the window is
    /// shorter than the configured minimum; the caller records nulls for
    /// the symbol and continues.
    pub fn compute(
        &self,
        window: &SnapshotWindow,
        benchmark: &SnapshotWindow,
        funding_cadence_hours: Option<u32>,
        computed_at: DateTime<Utc>,
    ) -> Result<FactorRecord, FactorError> {
        if window.len() < self.thresholds.min_data_points {
            return Err(FactorError::InsufficientHistory {
                required: self.thresholds.min_data_points,
                actual: window.len(),
            });
        }

        let latest = window.latest().ok_or(FactorError::InsufficientHistory {
            required: self.thresholds.min_data_points,
            actual: 0,
        })?;

        let relative = window.relative_prices(benchmark);
        let prices = window.prices();
        let volumes = window.volumes();
        let lookback = self.thresholds.lookback_hours;

        let mut record = FactorRecord::empty(&latest.symbol, latest.timestamp, computed_at);
        record.source_snapshot_id = latest.id;

        record.momentum_1h = momentum::momentum(&relative, 1);
        record.momentum_4h = momentum::momentum(&relative, 4);
        record.momentum_24h = momentum::momentum(&relative, 24);
        record.momentum_percentile = momentum::percentile(&relative, lookback);

        record.meanrev_zscore = mean_reversion::zscore(&relative);
        record.rsi_14 = mean_reversion::rsi_14(&relative);

        if let (Some(rate), Some(cadence)) = (latest.funding_rate, funding_cadence_hours) {
            record.carry_funding_annualized = rate
                .to_f64()
                .and_then(|r| carry::annualized_funding(r, cadence));
        }
        if let (Some(mark), Some(index)) = (latest.mark_price, latest.index_price) {
            if let (Some(mark), Some(index)) = (mark.to_f64(), index.to_f64()) {
                record.carry_basis = carry::basis(mark, index);
            }
        }

        record.volume_momentum_1h = volume::volume_momentum(&volumes, 1);
        record.volume_momentum_4h = volume::volume_momentum(&volumes, 4);
        record.volume_momentum_24h = volume::volume_momentum(&volumes, 24);
        record.volume_anomaly_zscore = volume::anomaly_zscore(&volumes);
        record.volume_percentile = volume::percentile(&volumes, lookback);
        record.volume_price_divergence = volume::price_divergence(&prices, &volumes);

        record.composite_score = composite::composite_score(
            &SubFactors {
                momentum_24h: record.momentum_24h,
                meanrev_zscore: record.meanrev_zscore,
                carry_annualized: record.carry_funding_annualized,
                volume_anomaly_zscore: record.volume_anomaly_zscore,
                volume_price_divergence: record.volume_price_divergence,
            },
            &self.weights,
        );

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use factor_pulse_data::Snapshot;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn snap(symbol: &str, hour_offset: i64, price: Decimal, volume: Decimal) -> Snapshot {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        Snapshot {
            id: Some(hour_offset),
            exchange: "binance".to_string(),
            symbol: symbol.to_string(),
            contract_type: "perpetual".to_string(),
            quote_asset: "USDT".to_string(),
            timestamp: base + chrono::Duration::hours(hour_offset),
            price,
            volume_1h: volume,
            volume_4h: None,
            volume_24h: None,
            open_interest: None,
            funding_rate: None,
            mark_price: None,
            index_price: None,
        }
    }

    fn engine() -> FactorEngine {
        let config = factor_pulse_core::AppConfig::default();
        FactorEngine::new(config.weights, config.thresholds)
    }

    fn flat_benchmark(hours: i64) -> SnapshotWindow {
        let snaps = (0..hours)
            .map(|h| snap("BTCUSDT", h, dec!(50000), dec!(1000)))
            .collect();
        SnapshotWindow::new(snaps).unwrap()
    }

    #[test]
    fn test_short_window_is_insufficient_history() {
        let snaps = (0..10)
            .map(|h| snap("ETHUSDT", h, dec!(3000), dec!(100)))
            .collect();
        let window = SnapshotWindow::new(snaps).unwrap();
        let err = engine()
            .compute(&window, &flat_benchmark(10), None, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            FactorError::InsufficientHistory {
                required: 25,
                actual: 10
            }
        ));
    }

    #[test]
    fn test_flat_benchmark_ten_percent_move_constant_volume() {
        // Price climbs 10% over the final 24 hours against a flat benchmark;
        // volume never changes.
        let snaps: Vec<Snapshot> = (0..49)
            .map(|h| {
                let price = if h < 25 {
                    dec!(100)
                } else {
                    // Linear climb from 100 to 110 over hours 25..=48.
                    dec!(100) + Decimal::from(h - 24) * dec!(10) / dec!(24)
                };
                snap("ASSETX", h, price, dec!(500))
            })
            .collect();
        let window = SnapshotWindow::new(snaps).unwrap();
        let record = engine()
            .compute(&window, &flat_benchmark(49), None, Utc::now())
            .unwrap();

        assert_relative_eq!(record.momentum_24h.unwrap(), 0.10, epsilon = 1e-9);
        assert_relative_eq!(record.volume_momentum_24h.unwrap(), 0.0);
        // Constant volume: anomaly z-score must be None, not zero.
        assert!(record.volume_anomaly_zscore.is_none());
        // No funding data.
        assert!(record.carry_funding_annualized.is_none());
        // Composite shifts positive purely from momentum and mean reversion
        // both reading the upward move.
        assert!(record.composite_score.unwrap() > 0.0);
    }

    #[test]
    fn test_funding_flows_into_carry() {
        let mut snaps: Vec<Snapshot> = (0..30)
            .map(|h| snap("ETHUSDT", h, dec!(3000), dec!(100)))
            .collect();
        snaps.last_mut().unwrap().funding_rate = Some(dec!(0.0001));
        let window = SnapshotWindow::new(snaps).unwrap();
        let record = engine()
            .compute(&window, &flat_benchmark(30), Some(8), Utc::now())
            .unwrap();
        assert_relative_eq!(
            record.carry_funding_annualized.unwrap(),
            0.0001 * 1095.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_recompute_is_reproducible() {
        let snaps: Vec<Snapshot> = (0..30)
            .map(|h| {
                snap(
                    "SOLUSDT",
                    h,
                    dec!(150) + Decimal::from(h % 7),
                    dec!(100) + Decimal::from(h % 5) * dec!(20),
                )
            })
            .collect();
        let window = SnapshotWindow::new(snaps).unwrap();
        let benchmark = flat_benchmark(30);
        let at = Utc::now();
        let a = engine().compute(&window, &benchmark, Some(8), at).unwrap();
        let b = engine().compute(&window, &benchmark, Some(8), at).unwrap();
        assert_eq!(a.composite_score, b.composite_score);
        assert_eq!(a.momentum_24h, b.momentum_24h);
        assert_eq!(a.rsi_14, b.rsi_14);
    }
}
