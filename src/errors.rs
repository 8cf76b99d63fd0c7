use thiserror::Error;

/// Failures raised by the indicator engine and the series model.
///
/// Undefined values are data (`None` in a series), never errors. These
/// variants are reserved for calls that cannot produce a meaningful result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("no bars supplied")]
    EmptyInput,

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("{indicator} needs at least {required} bars, got {available}")]
    InsufficientData {
        indicator: &'static str,
        required: usize,
        available: usize,
    },

    #[error("bar dates must be strictly increasing (violated at index {index})")]
    UnorderedDates { index: usize },

    #[error("cannot merge series with different date axes")]
    AxisMismatch,
}

impl IndicatorError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Failures raised by a market data provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("unknown ticker '{0}'")]
    UnknownTicker(String),

    #[error("no data for '{ticker}' in {range}")]
    NoData { ticker: String, range: String },

    #[error("provider rate limit reached, retry later")]
    RateLimited,

    #[error("provider returned an error: {0}")]
    Upstream(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}
