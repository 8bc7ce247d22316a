//! Composite score blending.

use factor_pulse_core::config::FactorWeights;

// Scales chosen so a "large" reading of each sub-factor saturates tanh:
// a 10% benchmark-relative 24h move, a 3-sigma price or volume deviation,
// a 50% annualized funding rate.
const MOMENTUM_SCALE: f64 = 0.10;
const ZSCORE_SCALE: f64 = 3.0;
const CARRY_SCALE: f64 = 0.50;
const DIVERGENCE_SCALE: f64 = 2.0;

/// Sub-factor inputs to the blend, each `None` when uncomputable.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubFactors {
    pub momentum_24h: Option<f64>,
    pub meanrev_zscore: Option<f64>,
    pub carry_annualized: Option<f64>,
    pub volume_anomaly_zscore: Option<f64>,
    pub volume_price_divergence: Option<f64>,
}

fn squash(value: f64, scale: f64) -> f64 {
    (value / scale).tanh()
}

fn volume_component(anomaly: Option<f64>, divergence: Option<f64>) -> Option<f64> {
    match (anomaly, divergence) {
        (Some(a), Some(d)) => Some((squash(a, ZSCORE_SCALE) + squash(d, DIVERGENCE_SCALE)) / 2.0),
        (Some(a), None) => Some(squash(a, ZSCORE_SCALE)),
        (None, Some(d)) => Some(squash(d, DIVERGENCE_SCALE)),
        (None, None) => None,
    }
}

/// Weighted blend of the four sub-factors into [-1, 1].
///
/// Each present sub-factor is squashed to [-1, 1] with tanh. Missing
/// sub-factors are dropped and the remaining weights renormalized, so a
/// spot-only symbol without carry data still scores on the other three.
/// All sub-factors missing yields `None`.
#[must_use]
pub fn composite_score(factors: &SubFactors, weights: &FactorWeights) -> Option<f64> {
    let components = [
        (
            weights.momentum,
            factors.momentum_24h.map(|m| squash(m, MOMENTUM_SCALE)),
        ),
        (
            weights.mean_reversion,
            factors.meanrev_zscore.map(|z| squash(z, ZSCORE_SCALE)),
        ),
        (
            weights.carry,
            factors.carry_annualized.map(|c| squash(c, CARRY_SCALE)),
        ),
        (
            weights.volume,
            volume_component(factors.volume_anomaly_zscore, factors.volume_price_divergence),
        ),
    ];

    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for (weight, component) in components {
        if let Some(value) = component {
            weighted_sum += weight * value;
            weight_total += weight;
        }
    }

    if weight_total == 0.0 {
        return None;
    }
    Some(weighted_sum / weight_total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn weights() -> FactorWeights {
        FactorWeights {
            momentum: 0.25,
            mean_reversion: 0.25,
            carry: 0.30,
            volume: 0.20,
        }
    }

    #[test]
    fn test_all_none_is_none() {
        assert!(composite_score(&SubFactors::default(), &weights()).is_none());
    }

    #[test]
    fn test_momentum_only_shifts_score_positive() {
        let factors = SubFactors {
            momentum_24h: Some(0.10),
            ..SubFactors::default()
        };
        // Renormalized to full weight on momentum: tanh(0.10 / 0.10).
        let score = composite_score(&factors, &weights()).unwrap();
        assert_relative_eq!(score, 1.0f64.tanh());
        assert!(score > 0.0);
    }

    #[test]
    fn test_score_bounded() {
        let factors = SubFactors {
            momentum_24h: Some(10.0),
            meanrev_zscore: Some(50.0),
            carry_annualized: Some(100.0),
            volume_anomaly_zscore: Some(40.0),
            volume_price_divergence: Some(1.0),
        };
        let score = composite_score(&factors, &weights()).unwrap();
        assert!((-1.0..=1.0).contains(&score));
        assert!(score > 0.9);
    }

    #[test]
    fn test_missing_carry_renormalizes() {
        let factors = SubFactors {
            momentum_24h: Some(0.05),
            meanrev_zscore: Some(1.0),
            carry_annualized: None,
            volume_anomaly_zscore: Some(1.0),
            volume_price_divergence: Some(0.5),
        };
        let with_carry = SubFactors {
            carry_annualized: Some(0.0),
            ..factors
        };
        let without = composite_score(&factors, &weights()).unwrap();
        let with = composite_score(&with_carry, &weights()).unwrap();
        // A zero carry reading drags the blend toward zero; a missing one
        // drops out entirely.
        assert!(without > with);
    }

    #[test]
    fn test_deterministic() {
        let factors = SubFactors {
            momentum_24h: Some(0.03),
            meanrev_zscore: Some(-1.2),
            carry_annualized: Some(0.15),
            volume_anomaly_zscore: Some(0.8),
            volume_price_divergence: Some(-0.2),
        };
        let a = composite_score(&factors, &weights()).unwrap();
        let b = composite_score(&factors, &weights()).unwrap();
        assert_relative_eq!(a, b);
    }
}
