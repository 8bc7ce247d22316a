//! Volume-based factors.

use crate::momentum;
use crate::stats;

/// Volume momentum over `period` hours, same indexing contract as price
/// momentum: the base sample is exactly `period` hours back.
#[must_use]
pub fn volume_momentum(volumes: &[f64], period: usize) -> Option<f64> {
    momentum::momentum(volumes, period)
}

/// Z-score of current volume against the window's historical volume.
#[must_use]
pub fn anomaly_zscore(volumes: &[f64]) -> Option<f64> {
    stats::zscore_last(volumes)
}

/// Percentile rank of current volume within the trailing lookback of
/// volume levels, as a fraction in [0, 1].
#[must_use]
pub fn percentile(volumes: &[f64], lookback: usize) -> Option<f64> {
    if volumes.len() < 2 {
        return None;
    }
    let start = volumes.len().saturating_sub(lookback + 1);
    stats::percentile_rank_last(&volumes[start..])
}

/// Rolling correlation between price returns and volume changes.
///
/// Positive values mean volume expands with price moves (co-movement);
/// negative values mean volume fades into the move. Pairs where either
/// step has a non-positive base are dropped in lockstep.
#[must_use]
pub fn price_divergence(prices: &[f64], volumes: &[f64]) -> Option<f64> {
    if prices.len() != volumes.len() || prices.len() < 3 {
        return None;
    }
    let price_changes = stats::fractional_changes(prices);
    let volume_changes = stats::fractional_changes(volumes);

    let mut xs = Vec::with_capacity(price_changes.len());
    let mut ys = Vec::with_capacity(volume_changes.len());
    for (p, v) in price_changes.iter().zip(&volume_changes) {
        if let (Some(p), Some(v)) = (p, v) {
            xs.push(*p);
            ys.push(*v);
        }
    }
    stats::pearson(&xs, &ys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_volume_momentum_is_zero() {
        let volumes = vec![500.0; 25];
        assert_relative_eq!(volume_momentum(&volumes, 24).unwrap(), 0.0);
    }

    #[test]
    fn test_constant_volume_anomaly_is_none() {
        // Zero dispersion must not coerce to z = 0.
        let volumes = vec![500.0; 25];
        assert!(anomaly_zscore(&volumes).is_none());
    }

    #[test]
    fn test_percentile_ranks_volume_levels() {
        let volumes = [100.0, 300.0, 200.0, 150.0, 400.0];
        assert_relative_eq!(percentile(&volumes, 24).unwrap(), 1.0);
    }

    #[test]
    fn test_volume_spike_has_positive_zscore() {
        let mut volumes = vec![100.0; 24];
        volumes.push(400.0);
        assert!(anomaly_zscore(&volumes).unwrap() > 3.0);
    }

    #[test]
    fn test_divergence_co_movement_positive() {
        // Volume rises and falls with price.
        let prices = [100.0, 102.0, 101.0, 104.0, 103.0, 107.0];
        let volumes = [100.0, 140.0, 90.0, 160.0, 85.0, 200.0];
        assert!(price_divergence(&prices, &volumes).unwrap() > 0.5);
    }

    #[test]
    fn test_divergence_constant_volume_is_none() {
        let prices = [100.0, 102.0, 101.0, 104.0];
        let volumes = [100.0, 100.0, 100.0, 100.0];
        assert!(price_divergence(&prices, &volumes).is_none());
    }
}
