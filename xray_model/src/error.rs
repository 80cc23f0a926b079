use crate::{model_service::ModelError, preprocess::PreprocessError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is unusable.
    Validation,
    /// The upload exceeds the configured body limit.
    TooLarge,
    /// The request was fine but the service failed to handle it.
    Internal,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No image uploaded")]
    MissingImage,
    #[error("Malformed multipart payload: {0}")]
    Multipart(String),
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    InvalidImage(#[from] PreprocessError),
    #[error("Inference failed: {0}")]
    Inference(#[from] ModelError),
    #[error("Explanation failed: {0}")]
    Explanation(String),
    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MissingImage | ApiError::Multipart(_) | ApiError::InvalidImage(_) => {
                ErrorKind::Validation
            }
            ApiError::PayloadTooLarge(_) => ErrorKind::TooLarge,
            ApiError::Inference(_) | ApiError::Explanation(_) | ApiError::Worker(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.kind() {
            ErrorKind::Validation | ErrorKind::TooLarge => {
                tracing::warn!("Rejected request: {}", self)
            }
            ErrorKind::Internal => tracing::error!("Request failed: {}", self),
        }

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_by_kind() {
        assert_eq!(ApiError::MissingImage.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Multipart("eof".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidImage(PreprocessError::Empty).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::PayloadTooLarge("limit".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::Inference(ModelError::EmptyBatch).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Explanation("oom".into()).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_missing_image_message() {
        assert_eq!(ApiError::MissingImage.to_string(), "No image uploaded");
    }
}
