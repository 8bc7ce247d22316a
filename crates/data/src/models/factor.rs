//! Computed factor scores for one symbol at one cross-section.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Factor scores computed from a snapshot window.
///
/// Factor fields are `Option<f64>`: a factor that cannot be computed (not
/// enough history, no funding data, zero dispersion) is stored as null and
/// is never coerced to `0.0`.
///
/// Unit contract: momentum, percentile, funding, basis, and divergence
/// fields are fractions (0.05 means 5%). Rendering multiplies by 100
/// exactly once.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FactorRecord {
    pub symbol: String,
    /// Hour-aligned cross-section time, shared by every record in the batch.
    pub timestamp: DateTime<Utc>,
    pub momentum_1h: Option<f64>,
    pub momentum_4h: Option<f64>,
    pub momentum_24h: Option<f64>,
    pub momentum_percentile: Option<f64>,
    pub meanrev_zscore: Option<f64>,
    pub rsi_14: Option<f64>,
    pub carry_funding_annualized: Option<f64>,
    pub carry_basis: Option<f64>,
    pub volume_momentum_1h: Option<f64>,
    pub volume_momentum_4h: Option<f64>,
    pub volume_momentum_24h: Option<f64>,
    pub volume_anomaly_zscore: Option<f64>,
    pub volume_percentile: Option<f64>,
    pub volume_price_divergence: Option<f64>,
    pub composite_score: Option<f64>,
    pub is_outlier: bool,
    /// "top" or "bottom" when `is_outlier` is set.
    pub outlier_type: Option<String>,
    pub computed_at: DateTime<Utc>,
    /// Row id of the newest snapshot the window ended on.
    pub source_snapshot_id: Option<i64>,
}

impl FactorRecord {
    /// A record carrying only identity fields; the engine fills in whatever
    /// factors the window supports.
    #[must_use]
    pub fn empty(symbol: &str, timestamp: DateTime<Utc>, computed_at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.to_string(),
            timestamp,
            momentum_1h: None,
            momentum_4h: None,
            momentum_24h: None,
            momentum_percentile: None,
            meanrev_zscore: None,
            rsi_14: None,
            carry_funding_annualized: None,
            carry_basis: None,
            volume_momentum_1h: None,
            volume_momentum_4h: None,
            volume_momentum_24h: None,
            volume_anomaly_zscore: None,
            volume_percentile: None,
            volume_price_divergence: None,
            composite_score: None,
            is_outlier: false,
            outlier_type: None,
            computed_at,
            source_snapshot_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_empty_record_has_no_scores() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let rec = FactorRecord::empty("ETHUSDT", ts, ts);
        assert_eq!(rec.symbol, "ETHUSDT");
        assert!(rec.composite_score.is_none());
        assert!(!rec.is_outlier);
        assert!(rec.outlier_type.is_none());
    }
}
