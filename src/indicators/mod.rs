// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators served by the API.
// Every function maps a `Series` to a `Series` (or an `IndicatorResult`) on
// the same date axis; positions without enough history are `None`.
//
// Parameters are validated before any computation starts. A short history is
// not an error unless the caller asks for it through `require_lookback`.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use bollinger::bbands;
pub use ema::ema;
pub use macd::macd;
pub use rsi::rsi;
pub use sma::sma;

use crate::errors::IndicatorError;

/// Fail with `InsufficientData` when `available` bars cannot produce a single
/// defined value for an indicator whose minimum history is `required`.
pub fn require_lookback(
    indicator: &'static str,
    required: usize,
    available: usize,
) -> Result<(), IndicatorError> {
    if available < required {
        return Err(IndicatorError::InsufficientData {
            indicator,
            required,
            available,
        });
    }
    Ok(())
}

/// Reject a period below one.
pub(crate) fn check_period(name: &'static str, period: usize) -> Result<(), IndicatorError> {
    if period < 1 {
        return Err(IndicatorError::invalid(name, "must be at least 1"));
    }
    Ok(())
}
