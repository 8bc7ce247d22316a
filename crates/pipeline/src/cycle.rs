//! One fetch-compute-classify-notify cycle.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use factor_pulse_binance::adapter::DEFAULT_FUNDING_CADENCE_HOURS;
use factor_pulse_binance::{build_universe, BinanceAdapter};
use factor_pulse_core::{AppConfig, Candle, MarketDataAdapter, NotificationSink};
use factor_pulse_data::{
    FactorRecord, FactorRepository, RetentionSweeper, Snapshot, SnapshotRepository, SweepReport,
    UniverseEntry, UniverseRepository, WriteMode,
};
use factor_pulse_factors::{classify_outliers, FactorEngine, SnapshotWindow};
use factor_pulse_notify::{render_digest, DedupGate, GateOutcome};
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Benchmark symbol every relative series is divided by.
const BENCHMARK_SYMBOL: &str = "BTCUSDT";

/// What one cycle did, for logging and tests.
#[derive(Debug)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub symbols_fetched: usize,
    pub symbols_failed: usize,
    pub records_computed: usize,
    pub outliers_marked: usize,
    pub gate_outcome: Option<GateOutcome>,
    pub sweep: Option<SweepReport>,
}

pub struct PipelineCycle {
    config: AppConfig,
    adapter: Arc<BinanceAdapter>,
    snapshots: SnapshotRepository,
    factors: FactorRepository,
    universe: UniverseRepository,
    sweeper: RetentionSweeper,
    gate: DedupGate,
    sink: Arc<dyn NotificationSink>,
}

impl PipelineCycle {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AppConfig,
        adapter: Arc<BinanceAdapter>,
        snapshots: SnapshotRepository,
        factors: FactorRepository,
        universe: UniverseRepository,
        sweeper: RetentionSweeper,
        gate: DedupGate,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            adapter,
            snapshots,
            factors,
            universe,
            sweeper,
            gate,
            sink,
        }
    }

    /// Runs one full cycle.
    ///
    /// Phases run strictly in order: universe refresh, bounded-concurrency
    /// fetch and persist, per-symbol factor computation, cross-sectional
    /// classification, the dedup gate, retention. All snapshot writes
    /// complete before any factor is computed; the classifier runs only
    /// after every symbol's record exists.
    ///
    /// # Errors
    /// Returns an error on storage failures or a failed universe bootstrap.
    /// Per-symbol fetch and compute failures are isolated and logged.
    pub async fn run(&self) -> Result<CycleReport> {
        let cycle_start = Utc::now();
        info!("Cycle starting");

        self.refresh_universe_if_stale().await?;
        let entries = self.universe.latest().await.context("loading universe")?;
        if entries.is_empty() {
            anyhow::bail!("universe is empty after refresh");
        }

        let (fetched, failed) = self.fetch_and_persist(&entries).await;
        // Every snapshot write above has completed; windows read from the
        // store below are whole.

        let cadence_by_symbol: HashMap<&str, u32> = entries
            .iter()
            .filter_map(|e| {
                e.funding_cadence_hours
                    .and_then(|c| u32::try_from(c).ok())
                    .map(|c| (e.symbol.as_str(), c))
            })
            .collect();

        let computed = self.compute_factors(&entries, &cadence_by_symbol).await?;
        let (mut records, stale) = cross_section(computed);
        if stale > 0 {
            warn!(stale, "Stale windows excluded from cross-section");
        }
        classify_outliers(&mut records, &self.config.thresholds);
        self.factors
            .upsert_batch(&records)
            .await
            .context("persisting factor records")?;

        let outliers_marked = records.iter().filter(|r| r.is_outlier).count();

        let gate_outcome = if let Some(ts) = records.first().map(|r| r.timestamp) {
            let digest = render_digest(&records, ts, self.adapter.degraded_limits());
            Some(
                self.gate
                    .evaluate(&digest, ts, self.sink.as_ref())
                    .await
                    .context("dedup gate")?,
            )
        } else {
            None
        };

        let sweep = match self.sweeper.sweep().await {
            Ok(report) => Some(report),
            Err(e) => {
                // Retention is housekeeping; a failed sweep must not fail
                // a cycle that already persisted and notified.
                error!(error = %e, "Retention sweep failed");
                None
            }
        };

        let report = CycleReport {
            timestamp: cycle_start,
            symbols_fetched: fetched,
            symbols_failed: failed,
            records_computed: records.len(),
            outliers_marked,
            gate_outcome,
            sweep,
        };
        info!(
            fetched = report.symbols_fetched,
            failed = report.symbols_failed,
            records = report.records_computed,
            outliers = report.outliers_marked,
            "Cycle complete"
        );
        Ok(report)
    }

    async fn refresh_universe_if_stale(&self) -> Result<()> {
        let today = Utc::now().date_naive();
        if let Some(latest) = self.universe.latest_date().await? {
            let age_hours = (today - latest).num_hours();
            if age_hours < self.config.universe.update_frequency_hours {
                return Ok(());
            }
        }

        info!(top_n = self.config.universe.top_n, "Refreshing universe");
        let futures_tickers = self
            .adapter
            .fetch_all_tickers()
            .await
            .context("fetching futures tickers")?;
        let spot_tickers = match self.adapter.fetch_spot_tickers().await {
            Ok(tickers) => tickers,
            Err(e) => {
                warn!(error = %e, "Spot ticker fetch failed, futures only");
                Vec::new()
            }
        };
        let cadences = match self.adapter.fetch_funding_cadences().await {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "Funding interval fetch failed, assuming default cadence");
                HashMap::new()
            }
        };

        let entries = build_universe(
            &futures_tickers,
            &spot_tickers,
            &cadences,
            DEFAULT_FUNDING_CADENCE_HOURS,
            self.config.universe.top_n,
            today,
        );
        self.universe
            .replace_for_date(today, &entries)
            .await
            .context("persisting universe")?;
        info!(symbols = entries.len(), "Universe refreshed");
        Ok(())
    }

    /// Fetches candles for every universe symbol (benchmark included) with
    /// bounded concurrency and persists them. The recent refetch window
    /// legitimately overwrites hours written by earlier cycles. Returns
    /// (fetched, failed) symbol counts.
    async fn fetch_and_persist(&self, entries: &[UniverseEntry]) -> (usize, usize) {
        let mut symbols: Vec<(String, String, String)> = entries
            .iter()
            .map(|e| {
                (
                    e.symbol.clone(),
                    e.contract_type.clone(),
                    e.quote_asset.clone(),
                )
            })
            .collect();
        if !symbols.iter().any(|(s, _, _)| s == BENCHMARK_SYMBOL) {
            symbols.push((
                BENCHMARK_SYMBOL.to_string(),
                "perpetual".to_string(),
                "USDT".to_string(),
            ));
        }

        let fetch_limit = self.window_hours();
        let now = Utc::now();

        let results = stream::iter(symbols.into_iter().map(
            |(symbol, contract_type, quote_asset)| {
                let adapter = Arc::clone(&self.adapter);
                let snapshots = self.snapshots.clone();
                async move {
                    let outcome = fetch_symbol_snapshots(
                        adapter.as_ref(),
                        &symbol,
                        &contract_type,
                        &quote_asset,
                        fetch_limit,
                        now,
                    )
                    .await;
                    match outcome {
                        Ok(batch) => {
                            if let Err(e) = snapshots
                                .insert_batch(&batch, WriteMode::BackfillOverwrite)
                                .await
                            {
                                error!(symbol = %symbol, error = %e, "Snapshot persist failed");
                                return false;
                            }
                            true
                        }
                        Err(e) => {
                            warn!(symbol = %symbol, error = %e, "Fetch failed, symbol skipped");
                            false
                        }
                    }
                }
            },
        ))
        .buffer_unordered(self.config.pipeline.fetch_concurrency.max(1))
        .collect::<Vec<bool>>()
        .await;

        let fetched = results.iter().filter(|ok| **ok).count();
        (fetched, results.len() - fetched)
    }

    async fn compute_factors(
        &self,
        entries: &[UniverseEntry],
        cadence_by_symbol: &HashMap<&str, u32>,
    ) -> Result<Vec<FactorRecord>> {
        let window_hours = self.window_hours();
        let benchmark_rows = self
            .snapshots
            .newest_window(BENCHMARK_SYMBOL, window_hours as i64)
            .await
            .context("loading benchmark window")?;
        let benchmark =
            SnapshotWindow::new(benchmark_rows).context("benchmark window out of order")?;

        let engine = FactorEngine::new(self.config.weights, self.config.thresholds.clone());
        let computed_at = Utc::now();
        let mut records = Vec::with_capacity(entries.len());

        for entry in entries {
            let rows = match self
                .snapshots
                .newest_window(&entry.symbol, window_hours as i64)
                .await
            {
                Ok(rows) => rows,
                Err(e) => {
                    error!(symbol = %entry.symbol, error = %e, "Window read failed");
                    continue;
                }
            };
            if rows.is_empty() {
                continue;
            }

            let window = match SnapshotWindow::new(rows) {
                Ok(window) => window,
                Err(e) => {
                    error!(symbol = %entry.symbol, error = %e, "Bad window ordering");
                    continue;
                }
            };

            let cadence = cadence_by_symbol.get(entry.symbol.as_str()).copied();
            match engine.compute(&window, &benchmark, cadence, computed_at) {
                Ok(record) => records.push(record),
                Err(e) => {
                    // Not enough history yet: record the symbol with null
                    // factors so the cross-section stays complete.
                    info!(symbol = %entry.symbol, error = %e, "Factors null this cycle");
                    if let Some(latest) = window.latest() {
                        let mut record = FactorRecord::empty(
                            &entry.symbol,
                            latest.timestamp,
                            computed_at,
                        );
                        record.source_snapshot_id = latest.id;
                        records.push(record);
                    }
                }
            }
        }
        Ok(records)
    }

    fn window_hours(&self) -> usize {
        self.config
            .thresholds
            .min_data_points
            .max(self.config.thresholds.lookback_hours + 1)
    }
}

/// Restricts computed records to the single newest cross-section hour.
///
/// A symbol whose fetch failed this cycle still has a window ending at an
/// older hour. Classifying that record against the current population, then
/// upserting it, would rewrite the symbol's already-classified historical
/// row with flags from the wrong cross-section. Stale records are dropped;
/// the symbol rejoins once its fetch recovers. Returns the surviving
/// records and the dropped count.
fn cross_section(records: Vec<FactorRecord>) -> (Vec<FactorRecord>, usize) {
    let Some(ts) = records.iter().map(|r| r.timestamp).max() else {
        return (records, 0);
    };
    let before = records.len();
    let current: Vec<FactorRecord> = records.into_iter().filter(|r| r.timestamp == ts).collect();
    let dropped = before - current.len();
    (current, dropped)
}

/// Fetches one symbol's candles and shapes them into snapshots.
///
/// The still-open hour is dropped; only closed candles persist. Rolling 4h
/// and 24h volumes come from the fetched candles where enough exist.
/// Funding, mark/index, and open interest attach to the newest snapshot of
/// perpetual symbols only.
async fn fetch_symbol_snapshots(
    adapter: &BinanceAdapter,
    symbol: &str,
    contract_type: &str,
    quote_asset: &str,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Snapshot>, factor_pulse_core::AdapterError> {
    // One extra candle so the newest closed hour still has `limit` behind it.
    let candles = adapter.fetch_candles(symbol, limit + 1, now).await?;
    let closed: Vec<Candle> = candles
        .into_iter()
        .filter(|c| c.timestamp + Duration::hours(1) <= now)
        .collect();

    let mut snapshots: Vec<Snapshot> = closed
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let rolling = |hours: usize| {
                if i + 1 >= hours {
                    Some(
                        closed[i + 1 - hours..=i]
                            .iter()
                            .map(|c| c.volume)
                            .sum::<rust_decimal::Decimal>(),
                    )
                } else {
                    None
                }
            };
            Snapshot {
                id: None,
                exchange: candle.exchange.as_str().to_string(),
                symbol: symbol.to_string(),
                contract_type: contract_type.to_string(),
                quote_asset: quote_asset.to_string(),
                timestamp: candle.timestamp,
                price: candle.close,
                volume_1h: candle.volume,
                volume_4h: rolling(4),
                volume_24h: rolling(24),
                open_interest: None,
                funding_rate: None,
                mark_price: None,
                index_price: None,
            }
        })
        .collect();

    if contract_type == "perpetual" {
        if let Some(latest) = snapshots.last_mut() {
            match adapter.fetch_funding_rate(symbol).await {
                Ok(Some(funding)) => latest.funding_rate = Some(funding.funding_rate),
                Ok(None) => {}
                Err(e) => warn!(symbol, error = %e, "Funding fetch failed"),
            }
            match adapter.fetch_mark_index(symbol).await {
                Ok(Some(mark_index)) => {
                    latest.mark_price = Some(mark_index.mark_price);
                    latest.index_price = Some(mark_index.index_price);
                }
                Ok(None) => {}
                Err(e) => warn!(symbol, error = %e, "Mark/index fetch failed"),
            }
            match adapter.fetch_open_interest(symbol).await {
                Ok(oi) => latest.open_interest = oi,
                Err(e) => warn!(symbol, error = %e, "Open interest fetch failed"),
            }
        }
    }

    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stale_window_records_are_excluded_from_cross_section() {
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let t1 = t0 + Duration::hours(1);
        // BBBUSDT's fetch failed this cycle, so its window still ends at t0.
        let records = vec![
            FactorRecord::empty("AAAUSDT", t1, t1),
            FactorRecord::empty("BBBUSDT", t0, t1),
            FactorRecord::empty("CCCUSDT", t1, t1),
        ];
        let (current, dropped) = cross_section(records);
        assert_eq!(dropped, 1);
        assert_eq!(current.len(), 2);
        assert!(current.iter().all(|r| r.timestamp == t1));
        assert!(!current.iter().any(|r| r.symbol == "BBBUSDT"));
    }

    #[test]
    fn test_cross_section_of_nothing_drops_nothing() {
        let (current, dropped) = cross_section(Vec::new());
        assert!(current.is_empty());
        assert_eq!(dropped, 0);
    }
}
