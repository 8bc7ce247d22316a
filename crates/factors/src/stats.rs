//! Small statistics helpers shared by the calculators.

/// Arithmetic mean; `None` on an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation; `None` on an empty slice.
#[must_use]
pub fn stddev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// Z-score of the last value against the whole slice.
///
/// Zero dispersion yields `None`, never a coerced zero.
#[must_use]
pub fn zscore_last(values: &[f64]) -> Option<f64> {
    let last = *values.last()?;
    let m = mean(values)?;
    let sd = stddev(values)?;
    if sd == 0.0 {
        return None;
    }
    Some((last - m) / sd)
}

/// Fraction of `values` (excluding the last) that the last value exceeds.
///
/// Returns a fraction in [0, 1]; `None` with fewer than two values.
#[must_use]
pub fn percentile_rank_last(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let (last, rest) = values.split_last()?;
    let below = rest.iter().filter(|v| *v < last).count();
    Some(below as f64 / rest.len() as f64)
}

/// Pearson correlation between two equal-length series.
///
/// `None` when lengths differ, fewer than two points, or either series has
/// zero variance.
#[must_use]
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

/// Step-over-step fractional changes of a series: `v[i]/v[i-1] - 1`.
///
/// Steps with a non-positive base are skipped in lockstep by callers that
/// need aligned pairs, so this returns `None` for those positions.
#[must_use]
pub fn fractional_changes(values: &[f64]) -> Vec<Option<f64>> {
    values
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                Some(w[1] / w[0] - 1.0)
            } else {
                None
            }
        })
        .collect()
}
