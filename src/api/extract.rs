// =============================================================================
// Request extractors
// =============================================================================
//
// Wrappers around axum's extractors whose rejections go through `ApiError`,
// so a malformed query string gets the same JSON error body as every other
// failure.
// =============================================================================

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;

/// `Query<T>` with a JSON `bad_request` rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Params {
        window: Option<usize>,
    }

    async fn extract(uri: &str) -> Result<ApiQuery<Params>, ApiError> {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        ApiQuery::<Params>::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn parses_valid_query() {
        let ApiQuery(params) = extract("/x?window=5").await.unwrap();
        assert_eq!(params.window, Some(5));
        let ApiQuery(params) = extract("/x").await.unwrap();
        assert_eq!(params.window, None);
    }

    #[tokio::test]
    async fn malformed_query_is_bad_request() {
        let err = extract("/x?window=-1").await.unwrap_err();
        assert_eq!(err.kind(), "bad_request");
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
