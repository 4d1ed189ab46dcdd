//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Human-readable message
    #[schema(example = "Retrieval error: index unreachable")]
    pub detail: String,
    /// Error code
    #[schema(example = "RETRIEVAL_ERROR")]
    pub code: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            detail: detail.into(),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Retrieval(String),
    Generation(String),
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::BadRequest(msg) => ApiError::new("BAD_REQUEST", msg),
            AppError::Retrieval(msg) => ApiError::new("RETRIEVAL_ERROR", msg),
            AppError::Generation(msg) => ApiError::new("GENERATION_ERROR", msg),
            AppError::Internal(msg) => ApiError::new("INTERNAL_ERROR", msg),
        };

        (status, Json(error)).into_response()
    }
}

/// Malformed or mistyped request bodies get the same JSON error shape as
/// every other failure
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<medgenie_core::MedGenieError> for AppError {
    fn from(err: medgenie_core::MedGenieError) -> Self {
        use medgenie_core::MedGenieError;

        let detail = err.to_string();
        match err {
            MedGenieError::ValidationError(msg) => AppError::BadRequest(msg),
            MedGenieError::RetrievalError(_) => AppError::Retrieval(detail),
            MedGenieError::GenerationError(_) => AppError::Generation(detail),
            MedGenieError::EmbeddingError(_)
            | MedGenieError::ConfigError(_)
            | MedGenieError::Other(_) => AppError::Internal(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medgenie_core::MedGenieError;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (
                MedGenieError::ValidationError("empty".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                MedGenieError::RetrievalError("down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                MedGenieError::GenerationError("down".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                MedGenieError::ConfigError("missing".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_retrieval_detail_keeps_message() {
        match AppError::from(MedGenieError::RetrievalError("index unreachable".to_string())) {
            AppError::Retrieval(detail) => {
                assert_eq!(detail, "Retrieval error: index unreachable")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
