//! Cross-sectional outlier classification.

use crate::stats;
use factor_pulse_core::config::Thresholds;
use factor_pulse_data::FactorRecord;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierType {
    Top,
    Bottom,
}

impl OutlierType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

/// Marks outliers across one cross-section in place.
///
/// Two non-exclusive rules fire `is_outlier`:
/// (a) the composite's cross-sectional z-score magnitude meets the
///     configured threshold;
/// (b) the record ranks in the top-N or bottom-N by composite score.
///
/// Ranking order is deterministic: composite descending, then symbol
/// ascending, so boundary ties resolve the same way on every run.
/// Records without a composite score are never outliers.
pub fn classify_outliers(records: &mut [FactorRecord], thresholds: &Thresholds) {
    for record in records.iter_mut() {
        record.is_outlier = false;
        record.outlier_type = None;
    }

    let scores: Vec<f64> = records
        .iter()
        .filter_map(|r| r.composite_score)
        .collect();
    if scores.is_empty() {
        return;
    }

    let mean = stats::mean(&scores).unwrap_or(0.0);
    let sd = stats::stddev(&scores).unwrap_or(0.0);

    // Indices of scored records, composite desc then symbol asc.
    let mut ranked: Vec<usize> = (0..records.len())
        .filter(|&i| records[i].composite_score.is_some())
        .collect();
    ranked.sort_by(|&a, &b| {
        let sa = records[a].composite_score.unwrap_or(f64::NEG_INFINITY);
        let sb = records[b].composite_score.unwrap_or(f64::NEG_INFINITY);
        sb.partial_cmp(&sa)
            .unwrap_or(Ordering::Equal)
            .then_with(|| records[a].symbol.cmp(&records[b].symbol))
    });

    let top_cut = thresholds.top_n_outliers.min(ranked.len());
    let bottom_cut = thresholds.bottom_n_outliers.min(ranked.len());

    for (rank, &idx) in ranked.iter().enumerate() {
        let score = records[idx].composite_score.unwrap_or(0.0);
        let z_fires = sd > 0.0 && ((score - mean) / sd).abs() >= thresholds.outlier_zscore;
        let in_top = rank < top_cut;
        let in_bottom = rank >= ranked.len() - bottom_cut;

        if z_fires || in_top || in_bottom {
            records[idx].is_outlier = true;
            // When a record qualifies on both ends of a tiny cross-section,
            // the side of the mean decides.
            let outlier_type = if in_top && !in_bottom {
                OutlierType::Top
            } else if in_bottom && !in_top {
                OutlierType::Bottom
            } else if score >= mean {
                OutlierType::Top
            } else {
                OutlierType::Bottom
            };
            records[idx].outlier_type = Some(outlier_type.as_str().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(symbol: &str, score: Option<f64>) -> FactorRecord {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut r = FactorRecord::empty(symbol, ts, ts);
        r.composite_score = score;
        r
    }

    fn thresholds(top_n: usize, bottom_n: usize) -> Thresholds {
        Thresholds {
            outlier_zscore: 2.0,
            top_n_outliers: top_n,
            bottom_n_outliers: bottom_n,
            min_data_points: 25,
            lookback_hours: 24,
            retention_days: 30,
        }
    }

    #[test]
    fn test_rank_rule_marks_extremes() {
        let mut records: Vec<FactorRecord> = (0..20)
            .map(|i| record(&format!("SYM{i:02}"), Some(f64::from(i) / 20.0 - 0.5)))
            .collect();
        classify_outliers(&mut records, &thresholds(3, 3));

        let tops: Vec<&str> = records
            .iter()
            .filter(|r| r.outlier_type.as_deref() == Some("top"))
            .map(|r| r.symbol.as_str())
            .collect();
        let bottoms: Vec<&str> = records
            .iter()
            .filter(|r| r.outlier_type.as_deref() == Some("bottom"))
            .map(|r| r.symbol.as_str())
            .collect();
        assert_eq!(tops, vec!["SYM17", "SYM18", "SYM19"]);
        assert_eq!(bottoms, vec!["SYM00", "SYM01", "SYM02"]);
    }

    #[test]
    fn test_zscore_rule_fires_independently_of_rank() {
        // 30 flat scores plus one extreme: the extreme is >2 sigma out.
        let mut records: Vec<FactorRecord> = (0..30)
            .map(|i| record(&format!("FLAT{i:02}"), Some(0.01 * f64::from(i % 3))))
            .collect();
        records.push(record("SPIKE", Some(0.9)));
        let mut t = thresholds(0, 0);
        t.outlier_zscore = 2.0;
        classify_outliers(&mut records, &t);

        let spike = records.iter().find(|r| r.symbol == "SPIKE").unwrap();
        assert!(spike.is_outlier);
        assert_eq!(spike.outlier_type.as_deref(), Some("top"));
        assert!(records
            .iter()
            .filter(|r| r.symbol != "SPIKE")
            .all(|r| !r.is_outlier));
    }

    #[test]
    fn test_tie_break_is_symbol_ascending() {
        // Eleven identical scores competing for a top-10 boundary: the
        // lexicographically largest symbol must be the one excluded, on
        // every run.
        let mut records: Vec<FactorRecord> = "ABCDEFGHIJK"
            .chars()
            .map(|c| record(&c.to_string(), Some(0.5)))
            .collect();
        records.reverse();
        classify_outliers(&mut records, &thresholds(10, 0));

        let marked: Vec<&str> = {
            let mut m: Vec<&str> = records
                .iter()
                .filter(|r| r.is_outlier)
                .map(|r| r.symbol.as_str())
                .collect();
            m.sort_unstable();
            m
        };
        assert_eq!(
            marked,
            vec!["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"]
        );
    }

    #[test]
    fn test_null_composite_never_outlier() {
        let mut records = vec![
            record("SCORED", Some(1.0)),
            record("NULL1", None),
            record("NULL2", None),
        ];
        classify_outliers(&mut records, &thresholds(5, 5));
        assert!(records.iter().filter(|r| r.is_outlier).all(|r| r.symbol == "SCORED"));
    }

    #[test]
    fn test_reclassification_clears_stale_flags() {
        let mut records = vec![record("A", Some(0.9)), record("B", Some(-0.9))];
        records[0].is_outlier = true;
        records[0].outlier_type = Some("bottom".to_string());
        classify_outliers(&mut records, &thresholds(1, 1));
        assert_eq!(records[0].outlier_type.as_deref(), Some("top"));
        assert_eq!(records[1].outlier_type.as_deref(), Some("bottom"));
    }
}
