use crate::error::ApiError;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart,
    },
    http::StatusCode,
};
use bytes::Bytes;

pub const IMAGE_FIELD: &str = "image";

/// Pulls the `image` part out of a multipart upload, skipping any other parts.
pub async fn read_image_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Bytes, ApiError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(MultipartRejection::InvalidBoundary(_)) => return Err(ApiError::MissingImage),
        Err(rejection) => return Err(ApiError::Multipart(rejection.body_text())),
    };

    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let data = field.bytes().await.map_err(read_error)?;
        tracing::debug!("Received image part of {} bytes", data.len());
        return Ok(data);
    }

    Err(ApiError::MissingImage)
}

fn read_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::Multipart(e.body_text())
    }
}
