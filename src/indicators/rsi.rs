// =============================================================================
// Relative Strength Index (RSI): Wilder's Smoothing
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1: Compute price changes (deltas) from consecutive closes.
// Step 2: Seed average gain / average loss with the SMA of the first `period`
//         gains / losses.
// Step 3: Apply Wilder's smoothing:
//           avg_gain = (prev_avg_gain * (period - 1) + current_gain) / period
//           avg_loss = (prev_avg_loss * (period - 1) + current_loss) / period
// Step 4: RS  = avg_gain / avg_loss
//         RSI = 100 - 100 / (1 + RS)
//
// Thresholds:  RSI >= 70 => OVERBOUGHT,  RSI <= 30 => OVERSOLD.
// =============================================================================

use serde::Serialize;

use crate::errors::IndicatorError;
use crate::series::Series;

/// Minimum number of bars needed for one defined RSI value.
pub fn lookback(period: usize) -> usize {
    period.saturating_add(1)
}

#[derive(Debug, Clone, Copy)]
enum RsiState {
    Seeding { gain: f64, loss: f64, count: usize },
    Smoothing { avg_gain: f64, avg_loss: f64 },
}

impl RsiState {
    const EMPTY: Self = Self::Seeding {
        gain: 0.0,
        loss: 0.0,
        count: 0,
    };
}

/// Compute the RSI series for `prices` and `period`, aligned to the input axis.
///
/// The first `period` positions are undefined (`period` deltas need
/// `period + 1` prices). An undefined price restarts the seeding.
///
/// # Errors
/// - `period == 0` => `InvalidParameter`
pub fn rsi(prices: &Series, period: usize) -> Result<Series, IndicatorError> {
    super::check_period("period", period)?;

    let period_f = period as f64;
    let values = prices.values();
    let mut out = Vec::with_capacity(values.len());
    if !values.is_empty() {
        out.push(None);
    }

    let tail = values.windows(2).scan(RsiState::EMPTY, |state, pair| {
        let (Some(prev), Some(curr)) = (pair[0], pair[1]) else {
            *state = RsiState::EMPTY;
            return Some(None);
        };
        let delta = curr - prev;
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);

        let averages = match *state {
            RsiState::Seeding {
                gain: g,
                loss: l,
                count,
            } => {
                let (g, l, count) = (g + gain, l + loss, count + 1);
                if count == period {
                    Some((g / period_f, l / period_f))
                } else {
                    *state = RsiState::Seeding {
                        gain: g,
                        loss: l,
                        count,
                    };
                    None
                }
            }
            RsiState::Smoothing { avg_gain, avg_loss } => Some((
                ((period_f - 1.0) * avg_gain + gain) / period_f,
                ((period_f - 1.0) * avg_loss + loss) / period_f,
            )),
        };

        Some(averages.and_then(|(avg_gain, avg_loss)| {
            *state = RsiState::Smoothing { avg_gain, avg_loss };
            rsi_from_averages(avg_gain, avg_loss)
        }))
    });
    out.extend(tail);

    Ok(prices.derive(out))
}

/// Market condition implied by an RSI reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiZone {
    pub fn classify(value: f64) -> Self {
        if value >= 70.0 {
            Self::Overbought
        } else if value <= 30.0 {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - If both averages are zero, RSI is 50.0 (no movement).
/// - If average loss is zero (only gains), RSI is 100.0.
/// - Returns `None` when the result is non-finite.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    rsi.is_finite().then(|| rsi.clamp(0.0, 100.0))
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

    fn ascending(n: usize) -> Vec<f64> {
        (1..=n).map(|x| x as f64).collect()
    }

    #[test]
    fn rsi_period_zero() {
        assert!(rsi(&prices(&[1.0, 2.0, 3.0]), 0).is_err());
    }

    #[test]
    fn rsi_insufficient_data() {
        // 14 closes => 13 deltas < 14.
        let out = rsi(&prices(&ascending(14)), 14).unwrap();
        assert_eq!(out.len(), 14);
        assert_eq!(out.defined_count(), 0);
    }

    #[test]
    fn rsi_fifteen_ascending_prices() {
        let out = rsi(&prices(&ascending(15)), 14).unwrap();
        let mut expected = vec![None; 14];
        expected.push(Some(100.0));
        assert_eq!(out.values(), expected.as_slice());
    }

    #[test]
    fn rsi_all_gains() {
        let out = rsi(&prices(&ascending(30)), 14).unwrap();
        assert_eq!(out.first_defined(), Some(14));
        for i in 14..30 {
            assert_eq!(out.get(i), Some(100.0));
        }
    }

    #[test]
    fn rsi_all_losses() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let out = rsi(&prices(&closes), 14).unwrap();
        for i in 14..30 {
            assert!(out.get(i).unwrap().abs() < 1e-10);
        }
    }

    #[test]
    fn rsi_flat_market() {
        let out = rsi(&prices(&[100.0; 30]), 14).unwrap();
        for i in 14..30 {
            assert_eq!(out.get(i), Some(50.0));
        }
    }

    #[test]
    fn rsi_range_check() {
        let closes = [
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let out = rsi(&prices(&closes), 14).unwrap();
        assert_eq!(out.defined_count(), 4);
        for (_, v) in out.iter() {
            if let Some(v) = v {
                assert!((0.0..=100.0).contains(&v), "RSI {v} out of range");
            }
        }
    }

    #[test]
    fn rsi_wilder_smoothing_known_values() {
        // period 2: deltas +2, -1, +3
        let out = rsi(&prices(&[10.0, 12.0, 11.0, 14.0]), 2).unwrap();
        // seed: avg_gain = 1.0, avg_loss = 0.5 => RS = 2 => RSI = 66.66..
        assert!((out.get(2).unwrap() - 200.0 / 3.0).abs() < 1e-10);
        // next: avg_gain = (1.0 + 3) / 2 = 2.0, avg_loss = 0.5 / 2 = 0.25 => RS = 8
        assert!((out.get(3).unwrap() - (100.0 - 100.0 / 9.0)).abs() < 1e-10);
    }

    #[test]
    fn rsi_period_one() {
        let out = rsi(&prices(&[1.0, 2.0, 1.0, 1.0]), 1).unwrap();
        assert_eq!(out.values(), &[None, Some(100.0), Some(0.0), Some(50.0)]);
    }

    #[test]
    fn rsi_is_idempotent() {
        let closes = [44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84];
        let a = rsi(&prices(&closes), 4).unwrap();
        let b = rsi(&prices(&closes), 4).unwrap();
        let bits = |s: &Series| -> Vec<Option<u64>> {
            s.values().iter().map(|v| v.map(f64::to_bits)).collect()
        };
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn rsi_huge_period_is_all_undefined() {
        assert_eq!(lookback(usize::MAX), usize::MAX);
        let out = rsi(&prices(&ascending(10)), usize::MAX).unwrap();
        assert_eq!(out.len(), 10);
        assert_eq!(out.defined_count(), 0);
    }

    // ---- zones -----------------------------------------------------------

    #[test]
    fn zone_thresholds() {
        assert_eq!(RsiZone::classify(100.0), RsiZone::Overbought);
        assert_eq!(RsiZone::classify(70.0), RsiZone::Overbought);
        assert_eq!(RsiZone::classify(50.0), RsiZone::Neutral);
        assert_eq!(RsiZone::classify(30.0), RsiZone::Oversold);
        assert_eq!(RsiZone::classify(0.0), RsiZone::Oversold);
    }
}
