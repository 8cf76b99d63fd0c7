// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent values, making it more responsive to new
// information than the Simple Moving Average (SMA).
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = x_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The first EMA value is seeded with the SMA of the first `period` consecutive
// defined values. An undefined input restarts the seeding, so the EMA of a
// series with an undefined prefix (e.g. the MACD line) seeds on its defined
// part.
// =============================================================================

use crate::errors::IndicatorError;
use crate::series::Series;

/// Accumulator carried through the fold.
#[derive(Debug, Clone, Copy)]
enum EmaState {
    Seeding { sum: f64, count: usize },
    Smoothing(f64),
}

impl EmaState {
    const EMPTY: Self = Self::Seeding { sum: 0.0, count: 0 };
}

/// Compute the EMA of `series` with span `period`, aligned to the input axis.
///
/// # Errors
/// - `period == 0` => `InvalidParameter`
pub fn ema(series: &Series, period: usize) -> Result<Series, IndicatorError> {
    super::check_period("period", period)?;

    let multiplier = 2.0 / (period as f64 + 1.0);
    let values = series
        .values()
        .iter()
        .scan(EmaState::EMPTY, |state, &value| {
            let Some(x) = value else {
                *state = EmaState::EMPTY;
                return Some(None);
            };
            let out = match *state {
                EmaState::Seeding { sum, count } => {
                    let (sum, count) = (sum + x, count + 1);
                    if count == period {
                        let seed = sum / period as f64;
                        *state = EmaState::Smoothing(seed);
                        Some(seed)
                    } else {
                        *state = EmaState::Seeding { sum, count };
                        None
                    }
                }
                EmaState::Smoothing(prev) => {
                    let next = x * multiplier + prev * (1.0 - multiplier);
                    *state = EmaState::Smoothing(next);
                    Some(next)
                }
            };
            Some(out)
        })
        .collect();

    Ok(series.derive(values))
}
