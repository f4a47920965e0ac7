//! API error responses
//!
//! Every failure answers `{ "error": "<message>" }` with 400, 404 or 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::TopicsError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed parameter (400)
    #[error("{0}")]
    BadRequest(String),

    /// Nothing resolves for the request (404)
    #[error("{0}")]
    NotFound(String),

    /// Anything else (500)
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<TopicsError> for ApiError {
    fn from(e: TopicsError) -> Self {
        if e.is_not_found() {
            ApiError::NotFound(e.to_string())
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(msg) => {
                error!(error = %msg, "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics_error_mapping() {
        let not_found: ApiError = TopicsError::NotFound("x".into()).into();
        assert!(matches!(not_found, ApiError::NotFound(_)));

        let shape: ApiError = TopicsError::Shape("bad".into()).into();
        assert!(matches!(shape, ApiError::Internal(_)));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }
}
