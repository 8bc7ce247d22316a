//! Mean-reversion signals: rolling z-score and Wilder RSI.

use crate::stats;

/// Standard deviations of the current value from the window mean.
///
/// Zero dispersion yields `None`.
#[must_use]
pub fn zscore(series: &[f64]) -> Option<f64> {
    stats::zscore_last(series)
}

const RSI_PERIOD: usize = 14;

/// RSI-14 with Wilder smoothing, clipped to [0, 100].
///
/// Needs at least 15 samples (14 deltas). All-gains yields 100.0,
/// all-losses 0.0.
#[must_use]
pub fn rsi_14(series: &[f64]) -> Option<f64> {
    if series.len() < RSI_PERIOD + 1 {
        return None;
    }

    let deltas: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = deltas[..RSI_PERIOD]
        .iter()
        .map(|d| d.max(0.0))
        .sum::<f64>()
        / RSI_PERIOD as f64;
    let mut avg_loss = deltas[..RSI_PERIOD]
        .iter()
        .map(|d| (-d).max(0.0))
        .sum::<f64>()
        / RSI_PERIOD as f64;

    for delta in &deltas[RSI_PERIOD..] {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        avg_gain = (avg_gain * (RSI_PERIOD as f64 - 1.0) + gain) / RSI_PERIOD as f64;
        avg_loss = (avg_loss * (RSI_PERIOD as f64 - 1.0) + loss) / RSI_PERIOD as f64;
    }

    let rsi = if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    };

    Some(rsi.clamp(0.0, 100.0))
}
