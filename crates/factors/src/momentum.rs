//! Price momentum over fixed horizons.

use crate::stats;

/// Fractional return over `period` hours: `price[t] / price[t-p] - 1`.
///
/// The base sample is the `(period + 1)`-th most recent, since index
/// `len - 1` is "now". A window of exactly `period` samples reaches only
/// `period - 1` hours back and yields `None`.
#[must_use]
pub fn momentum(series: &[f64], period: usize) -> Option<f64> {
    if series.len() < period + 1 {
        return None;
    }
    let current = *series.last()?;
    let base = series[series.len() - 1 - period];
    if base <= 0.0 {
        return None;
    }
    Some(current / base - 1.0)
}

/// Percentile rank of the current 1h return within the trailing lookback
/// of 1h returns, as a fraction in [0, 1].
///
/// The series is converted to step-over-step returns first; ranking price
/// levels would report 1.0 for any rising series regardless of how weak
/// the latest hour was.
#[must_use]
pub fn percentile(series: &[f64], lookback: usize) -> Option<f64> {
    let returns: Vec<f64> = stats::fractional_changes(series)
        .into_iter()
        .flatten()
        .collect();
    if returns.len() < 2 {
        return None;
    }
    let start = returns.len().saturating_sub(lookback + 1);
    stats::percentile_rank_last(&returns[start..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_momentum_uses_sample_exactly_period_hours_back() {
        // 25 samples: index 0 is 24h before index 24.
        let mut series = vec![100.0; 25];
        series[0] = 80.0;
        series[24] = 88.0;
        // 88 / 80 - 1, not 88 / series[1] - 1.
        assert_relative_eq!(momentum(&series, 24).unwrap(), 0.1);
    }

    #[test]
    fn test_momentum_known_ratio() {
        let series: Vec<f64> = (0..25).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let expected = 1.01f64.powi(24) - 1.0;
        assert_relative_eq!(momentum(&series, 24).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_momentum_window_too_short() {
        // Exactly `period` samples reaches only period-1 hours back.
        let series = vec![1.0; 24];
        assert!(momentum(&series, 24).is_none());
        let series = vec![1.0; 25];
        assert!(momentum(&series, 24).is_some());
    }

    #[test]
    fn test_momentum_one_hour() {
        let series = [100.0, 100.0, 105.0];
        assert_relative_eq!(momentum(&series, 1).unwrap(), 0.05);
    }

    #[test]
    fn test_percentile_ranks_returns_not_price_levels() {
        // Strictly rising prices whose increments shrink every hour: the
        // latest 1h return is the weakest in the window, so its percentile
        // is 0.0 even though the latest price level is the highest.
        let series: Vec<f64> = (1..=26).map(|i| 100.0 * f64::from(i)).collect();
        assert_relative_eq!(percentile(&series, 24).unwrap(), 0.0);
    }

    #[test]
    fn test_percentile_strongest_return_is_one() {
        let series = [100.0, 101.0, 102.0, 103.0, 110.0];
        let p = percentile(&series, 24).unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert_relative_eq!(p, 1.0);
    }
}
