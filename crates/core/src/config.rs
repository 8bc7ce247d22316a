use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub binance: BinanceConfig,
    pub universe: UniverseConfig,
    pub weights: FactorWeights,
    pub thresholds: Thresholds,
    pub dedup: DedupConfig,
    pub telegram: TelegramConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceConfig {
    pub spot_api_url: String,
    pub futures_api_url: String,
    pub rate_limit_per_minute: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseConfig {
    /// Number of top assets by 24h quote volume to track.
    pub top_n: usize,
    /// Minimum hours between universe refreshes.
    pub update_frequency_hours: i64,
}

/// Weights for blending the four sub-factors into the composite score.
/// Must sum to 1.0; validated at configuration load before any I/O.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FactorWeights {
    pub momentum: f64,
    pub mean_reversion: f64,
    pub carry: f64,
    pub volume: f64,
}

impl FactorWeights {
    const SUM_TOLERANCE: f64 = 1e-6;

    /// # Errors
    /// Returns `ConfigError::WeightsSum` if the weights do not sum to 1.0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sum = self.momentum + self.mean_reversion + self.carry + self.volume;
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(ConfigError::WeightsSum(sum));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Cross-sectional z-score magnitude that flags an outlier.
    pub outlier_zscore: f64,
    pub top_n_outliers: usize,
    pub bottom_n_outliers: usize,
    /// Minimum snapshots required before factors are computed for a symbol.
    pub min_data_points: usize,
    /// Trailing window (hours) for percentiles, z-scores, and correlations.
    pub lookback_hours: usize,
    /// Snapshots older than this are purged by the retention sweep.
    pub retention_days: i64,
}

/// Coarsening granularity for the dedup fingerprint. Tunable because the
/// right sensitivity is an open question: too coarse suppresses real changes,
/// too fine defeats dedup on jitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Bullish/bearish breadth percentages round to the nearest multiple.
    pub breadth_granularity_pct: f64,
    /// Average momentum percentage rounds to the nearest multiple.
    pub momentum_granularity_pct: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            breadth_granularity_pct: 2.0,
            momentum_granularity_pct: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Cron expression for the hourly cycle.
    pub cron_schedule: String,
    /// Maximum concurrent per-symbol fetches.
    pub fetch_concurrency: usize,
}

impl AppConfig {
    /// Validates the loaded configuration. Called by the loader so that bad
    /// weights or thresholds fail at startup, before any I/O.
    ///
    /// # Errors
    /// Returns `ConfigError` on weights not summing to 1.0 or nonsensical
    /// thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        if self.thresholds.outlier_zscore <= 0.0 {
            return Err(ConfigError::Threshold(format!(
                "outlier_zscore must be positive, got {}",
                self.thresholds.outlier_zscore
            )));
        }
        if self.thresholds.lookback_hours < 2 {
            return Err(ConfigError::Threshold(format!(
                "lookback_hours must be at least 2, got {}",
                self.thresholds.lookback_hours
            )));
        }
        if self.dedup.breadth_granularity_pct <= 0.0 || self.dedup.momentum_granularity_pct <= 0.0 {
            return Err(ConfigError::Threshold(
                "dedup granularities must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/factor_pulse".to_string(),
                max_connections: 10,
            },
            binance: BinanceConfig {
                spot_api_url: "https://api.binance.com".to_string(),
                futures_api_url: "https://fapi.binance.com".to_string(),
                rate_limit_per_minute: 1200,
            },
            universe: UniverseConfig {
                top_n: 50,
                update_frequency_hours: 24,
            },
            weights: FactorWeights {
                momentum: 0.25,
                mean_reversion: 0.25,
                carry: 0.30,
                volume: 0.20,
            },
            thresholds: Thresholds {
                outlier_zscore: 2.0,
                top_n_outliers: 10,
                bottom_n_outliers: 10,
                min_data_points: 25,
                lookback_hours: 24,
                retention_days: 30,
            },
            dedup: DedupConfig {
                breadth_granularity_pct: 2.0,
                momentum_granularity_pct: 50.0,
            },
            telegram: TelegramConfig {
                enabled: false,
                bot_token: None,
                chat_id: None,
            },
            pipeline: PipelineConfig {
                cron_schedule: "0 5 * * * *".to_string(),
                fetch_concurrency: 8,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        let weights = FactorWeights {
            momentum: 0.25,
            mean_reversion: 0.25,
            carry: 0.30,
            volume: 0.20,
        };
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_bad_weights_rejected() {
        let weights = FactorWeights {
            momentum: 0.5,
            mean_reversion: 0.5,
            carry: 0.5,
            volume: 0.5,
        };
        let err = weights.validate().unwrap_err();
        assert!(matches!(err, ConfigError::WeightsSum(s) if (s - 2.0).abs() < 1e-9));
    }

    #[test]
    fn test_negative_zscore_threshold_rejected() {
        let mut config = AppConfig::default();
        config.thresholds.outlier_zscore = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_dedup_granularity_rejected() {
        let mut config = AppConfig::default();
        config.dedup.breadth_granularity_pct = 0.0;
        assert!(config.validate().is_err());
    }
}
