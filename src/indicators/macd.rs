// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
//   macd      = EMA(prices, fast) - EMA(prices, slow)
//   signal    = EMA(macd, signal_period)
//   histogram = macd - signal
//
// The MACD line is defined from the slow EMA's seed onward. The signal EMA
// seeds on the defined part of the MACD line, so the first signal value sits
// at index `slow + signal - 2`.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::errors::IndicatorError;
use crate::indicators::ema;
use crate::series::{IndicatorResult, Series};

/// MACD periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

impl MacdParams {
    pub fn validate(&self) -> Result<(), IndicatorError> {
        super::check_period("fast", self.fast)?;
        super::check_period("slow", self.slow)?;
        super::check_period("signal", self.signal)?;
        if self.fast >= self.slow {
            return Err(IndicatorError::invalid(
                "fast",
                format!("must be below slow ({} >= {})", self.fast, self.slow),
            ));
        }
        Ok(())
    }

    /// Minimum number of bars needed for one defined signal value.
    pub fn lookback(&self) -> usize {
        self.slow.saturating_add(self.signal).saturating_sub(1)
    }
}

/// Compute MACD, signal and histogram lines over `prices`.
///
/// Returns an [`IndicatorResult`] with the components `macd`, `signal` and
/// `histogram`.
///
/// # Errors
/// - any period `< 1` or `fast >= slow` => `InvalidParameter`
pub fn macd(prices: &Series, params: MacdParams) -> Result<IndicatorResult, IndicatorError> {
    params.validate()?;

    let fast = ema(prices, params.fast)?;
    let slow = ema(prices, params.slow)?;
    let macd_line = fast.zip_with(&slow, |f, s| f - s)?;
    let signal_line = ema(&macd_line, params.signal)?;
    let histogram = macd_line.zip_with(&signal_line, |m, s| m - s)?;

    IndicatorResult::single("macd", macd_line)
        .with("signal", signal_line)?
        .with("histogram", histogram)
}
