// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
//   SMA_t = (x_{t-period+1} + ... + x_t) / period
//
// The first `period - 1` positions are undefined.
// =============================================================================

use crate::errors::IndicatorError;
use crate::series::Series;

/// Minimum number of bars needed for one defined SMA value.
pub fn lookback(period: usize) -> usize {
    period
}

/// Compute the SMA of `prices` over `period` values, aligned to the input axis.
///
/// # Errors
/// - `period == 0` => `InvalidParameter`
pub fn sma(prices: &Series, period: usize) -> Result<Series, IndicatorError> {
    super::check_period("period", period)?;

    let mut values = vec![None; prices.len()];
    for window in prices.rolling_window(period) {
        values[window.end()] = Some(window.mean());
    }
    Ok(prices.derive(values))
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn prices(values: &[f64]) -> Series {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = start.iter_days().take(values.len()).collect();
        Series::new(dates, values.iter().copied().map(Some).collect()).unwrap()
    }

    #[test]
    fn sma_period_zero() {
        assert!(matches!(
            sma(&prices(&[1.0, 2.0]), 0),
            Err(IndicatorError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn sma_constant_series() {
        let out = sma(&prices(&[10.0; 5]), 3).unwrap();
        assert_eq!(out.values(), &[None, None, Some(10.0), Some(10.0), Some(10.0)]);
    }

    #[test]
    fn sma_period_equals_length() {
        let out = sma(&prices(&[2.0, 4.0, 6.0, 8.0]), 4).unwrap();
        assert_eq!(out.defined_count(), 1);
        assert_eq!(out.get(3), Some(5.0));
    }

    #[test]
    fn sma_short_history_is_all_undefined() {
        let input = prices(&[1.0, 2.0]);
        let out = sma(&input, 5).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.defined_count(), 0);
        assert!(out.same_axis(&input));
    }

    #[test]
    fn sma_known_values() {
        let out = sma(&prices(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), 3).unwrap();
        assert_eq!(
            out.values(),
            &[None, None, Some(2.0), Some(3.0), Some(4.0), Some(5.0)]
        );
    }

    #[test]
    fn sma_period_one_is_identity() {
        let input = prices(&[3.0, 1.0, 4.0]);
        assert_eq!(sma(&input, 1).unwrap().values(), input.values());
    }

    #[test]
    fn sma_is_idempotent() {
        let input = prices(&[44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10]);
        let a = sma(&input, 4).unwrap();
        let b = sma(&input, 4).unwrap();
        let bits = |s: &Series| -> Vec<Option<u64>> {
            s.values().iter().map(|v| v.map(f64::to_bits)).collect()
        };
        assert_eq!(bits(&a), bits(&b));
    }
}
