// =============================================================================
// API error mapping
// =============================================================================
//
// Every failure reaching a handler is converted into a JSON body
// `{"error": <message>, "kind": <machine-readable kind>}` with a status code
// chosen by error class: caller mistakes are 4xx, provider trouble is 5xx.
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::errors::{IndicatorError, ProviderError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Indicator(e) => match e {
                IndicatorError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
                IndicatorError::EmptyInput | IndicatorError::InsufficientData { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                IndicatorError::UnorderedDates { .. } => StatusCode::BAD_GATEWAY,
                IndicatorError::AxisMismatch => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Provider(e) => match e {
                ProviderError::UnknownTicker(_) | ProviderError::NoData { .. } => {
                    StatusCode::NOT_FOUND
                }
                ProviderError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                ProviderError::Http(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
                ProviderError::Upstream(_)
                | ProviderError::Http(_)
                | ProviderError::SerdeJson(_) => StatusCode::BAD_GATEWAY,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Indicator(e) => match e {
                IndicatorError::EmptyInput => "empty_input",
                IndicatorError::InvalidParameter { .. } => "invalid_parameter",
                IndicatorError::InsufficientData { .. } => "insufficient_data",
                IndicatorError::UnorderedDates { .. } => "unordered_dates",
                IndicatorError::AxisMismatch => "axis_mismatch",
            },
            Self::Provider(e) => match e {
                ProviderError::UnknownTicker(_) => "unknown_ticker",
                ProviderError::NoData { .. } => "no_data",
                ProviderError::RateLimited => "rate_limited",
                ProviderError::Upstream(_) | ProviderError::Http(_) | ProviderError::SerdeJson(_) => {
                    "provider_unavailable"
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(status = status.as_u16(), kind = self.kind(), error = %message, "request failed");
        } else {
            warn!(status = status.as_u16(), kind = self.kind(), error = %message, "request rejected");
        }

        let body = serde_json::json!({
            "error": message,
            "kind": self.kind(),
        });
        (status, Json(body)).into_response()
    }
}
