//! Carry signals from perpetual funding and futures basis.

const HOURS_PER_YEAR: f64 = 24.0 * 365.0;

/// Annualized funding rate as a fraction.
///
/// `rate` is the per-period funding fraction; `cadence_hours` is the
/// funding interval (8h on most venues, shorter on some). The number of
/// periods per year follows from the cadence.
#[must_use]
pub fn annualized_funding(rate: f64, cadence_hours: u32) -> Option<f64> {
    if cadence_hours == 0 {
        return None;
    }
    Some(rate * HOURS_PER_YEAR / f64::from(cadence_hours))
}

/// Futures basis: `(mark - index) / index`, as a fraction.
#[must_use]
pub fn basis(mark: f64, index: f64) -> Option<f64> {
    if index <= 0.0 {
        return None;
    }
    Some((mark - index) / index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_eight_hour_cadence_gives_1095_periods() {
        // 0.01% per 8h funding is ~10.95% annualized.
        let annualized = annualized_funding(0.0001, 8).unwrap();
        assert_relative_eq!(annualized, 0.0001 * 1095.0);
    }

    #[test]
    fn test_cadence_scales_annualization() {
        let every_8h = annualized_funding(0.0001, 8).unwrap();
        let every_4h = annualized_funding(0.0001, 4).unwrap();
        assert_relative_eq!(every_4h, every_8h * 2.0);
    }

    #[test]
    fn test_zero_cadence_is_none() {
        assert!(annualized_funding(0.0001, 0).is_none());
    }

    #[test]
    fn test_basis_fraction() {
        assert_relative_eq!(basis(101.0, 100.0).unwrap(), 0.01);
        assert_relative_eq!(basis(99.0, 100.0).unwrap(), -0.01);
    }

    #[test]
    fn test_basis_bad_index_is_none() {
        assert!(basis(100.0, 0.0).is_none());
    }
}
