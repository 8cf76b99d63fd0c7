// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), where σ is the population standard deviation
// of the same window used for the middle band.
//
// A flat window has σ = 0, so all three bands coincide.

use crate::errors::IndicatorError;
use crate::series::{IndicatorResult, Series};

/// Minimum number of bars needed for one defined band value.
pub fn lookback(period: usize) -> usize {
    period
}

/// Check band parameters without computing anything.
pub fn validate(period: usize, num_std: f64) -> Result<(), IndicatorError> {
    super::check_period("period", period)?;
    if !(num_std.is_finite() && num_std > 0.0) {
        return Err(IndicatorError::invalid(
            "num_std",
            format!("must be a positive number, got {num_std}"),
        ));
    }
    Ok(())
}

/// Calculate Bollinger Bands over `prices`.
///
/// Returns an [`IndicatorResult`] with the components `middle`, `upper` and
/// `lower`, all on the input date axis. Undefined positions mirror the middle
/// band's undefined prefix.
///
/// # Errors
/// - `period == 0` => `InvalidParameter`
/// - `num_std <= 0` or non-finite => `InvalidParameter`
pub fn bbands(prices: &Series, period: usize, num_std: f64) -> Result<IndicatorResult, IndicatorError> {
    validate(period, num_std)?;

    let n = prices.len();
    let mut middle = vec![None; n];
    let mut upper = vec![None; n];
    let mut lower = vec![None; n];

    for window in prices.rolling_window(period) {
        let i = window.end();
        let mean = window.mean();
        let spread = num_std * window.population_std_dev();
        middle[i] = Some(mean);
        upper[i] = Some(mean + spread);
        lower[i] = Some(mean - spread);
    }

    IndicatorResult::single("middle", prices.derive(middle))
        .with("upper", prices.derive(upper))?
        .with("lower", prices.derive(lower))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::sma;
    use chrono::NaiveDate;

    fn prices(values: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = start.iter_days().take(values.len()).collect();
        Series::new(dates, values.iter().copied().map(Some).collect()).unwrap()
    }

    fn bits(result: &IndicatorResult) -> Vec<Vec<Option<u64>>> {
        result
            .names()
            .map(|name| {
                let series = result.get(name).unwrap();
                series.values().iter().map(|v| v.map(f64::to_bits)).collect()
            })
            .collect()
    }

    #[test]
    fn bollinger_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let bb = bbands(&prices(&closes), 20, 2.0).unwrap();
        let upper = bb.get("upper").unwrap().get(19).unwrap();
        let middle = bb.get("middle").unwrap().get(19).unwrap();
        let lower = bb.get("lower").unwrap().get(19).unwrap();
        assert!((middle - 10.5).abs() < 1e-12);
        // population σ of 1..=20 is sqrt((20^2 - 1) / 12)
        let sigma = ((400.0_f64 - 1.0) / 12.0).sqrt();
        assert!((upper - (10.5 + 2.0 * sigma)).abs() < 1e-9);
        assert!((lower - (10.5 - 2.0 * sigma)).abs() < 1e-9);
    }

    #[test]
    fn bollinger_flat_bands_collapse() {
        let bb = bbands(&prices(&[100.0; 25]), 20, 2.0).unwrap();
        let (middle, upper, lower) = (
            bb.get("middle").unwrap(),
            bb.get("upper").unwrap(),
            bb.get("lower").unwrap(),
        );
        for i in 19..25 {
            assert_eq!(middle.get(i), Some(100.0));
            assert_eq!(upper.get(i), middle.get(i));
            assert_eq!(lower.get(i), middle.get(i));
        }
    }

    #[test]
    fn bollinger_undefined_prefix_matches_sma() {
        let input = prices(&[3.0, 5.0, 4.0, 6.0, 8.0, 7.0]);
        let bb = bbands(&input, 3, 2.0).unwrap();
        let mid = sma(&input, 3).unwrap();
        assert_eq!(bb.get("middle").unwrap(), &mid);
        for name in ["upper", "lower"] {
            let band = bb.get(name).unwrap();
            assert_eq!(band.first_defined(), mid.first_defined());
            assert_eq!(band.len(), input.len());
        }
    }

    #[test]
    fn bollinger_component_order() {
        let bb = bbands(&prices(&[1.0, 2.0, 3.0]), 2, 1.0).unwrap();
        let names: Vec<&str> = bb.names().collect();
        assert_eq!(names, vec!["middle", "upper", "lower"]);
    }

    #[test]
    fn bollinger_rejects_non_positive_std() {
        let input = prices(&[1.0, 2.0, 3.0]);
        for k in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                bbands(&input, 2, k),
                Err(IndicatorError::InvalidParameter { name: "num_std", .. })
            ));
        }
    }

    #[test]
    fn bollinger_is_idempotent() {
        let input = prices(&[44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42]);
        let a = bbands(&input, 5, 2.0).unwrap();
        let b = bbands(&input, 5, 2.0).unwrap();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn bollinger_insufficient_data_is_all_undefined() {
        let bb = bbands(&prices(&[1.0, 2.0, 3.0]), 20, 2.0).unwrap();
        assert_eq!(bb.len(), 3);
        assert_eq!(bb.get("upper").unwrap().defined_count(), 0);
    }
}
