//! Multipart image upload extractor
//!
//! Reads the `image` field, enforcing the content-type allow list and the
//! byte limit while streaming, and rejects with the API error envelope.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::StatusCode;
use bytes::BytesMut;
use tracing::debug;

use crate::api::state::AppState;
use crate::config::UploadConfig;
use crate::infrastructure::services::ImageUpload;

use super::error::ApiError;

/// Name of the multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// A validated image taken from a `multipart/form-data` body
#[derive(Debug, Clone)]
pub struct ImageForm(pub ImageUpload);

impl FromRequest<AppState> for ImageForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let limits = &state.config.uploads;

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, limits))?
        {
            if field.name() != Some(IMAGE_FIELD) {
                continue;
            }
            return read_image(field, limits).await.map(ImageForm);
        }

        Err(ApiError::bad_request(format!(
            "Missing '{}' file field",
            IMAGE_FIELD
        )))
    }
}

async fn read_image(mut field: Field<'_>, limits: &UploadConfig) -> Result<ImageUpload, ApiError> {
    let content_type = field.content_type().unwrap_or_default();
    if !is_allowed_content_type(content_type, &limits.allowed_mime) {
        debug!(content_type = %content_type, "Rejected upload content type");
        return Err(ApiError::bad_request("Only JPEG/PNG allowed"));
    }

    let filename = field.file_name().map(str::to_owned);
    let mut buffer = BytesMut::new();

    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limits))? {
        if buffer.len() + chunk.len() > limits.max_bytes {
            return Err(too_large(limits));
        }
        buffer.extend_from_slice(&chunk);
    }

    Ok(ImageUpload {
        filename,
        bytes: buffer.freeze(),
    })
}

/// Compare the media type only, ignoring parameters and case
fn is_allowed_content_type(content_type: &str, allowed: &[String]) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    !essence.is_empty() && allowed.iter().any(|mime| mime.eq_ignore_ascii_case(essence))
}

fn multipart_error(err: MultipartError, limits: &UploadConfig) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(limits)
    } else {
        ApiError::bad_request(err.body_text())
    }
}

fn too_large(limits: &UploadConfig) -> ApiError {
    ApiError::bad_request(too_large_message(limits.max_bytes))
}

pub fn too_large_message(max_bytes: usize) -> String {
    format!("File too large (max {}MB)", max_bytes / (1024 * 1024))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        UploadConfig::default().allowed_mime
    }

    #[test]
    fn test_allowed_content_types() {
        assert!(is_allowed_content_type("image/jpeg", &allowed()));
        assert!(is_allowed_content_type("image/png", &allowed()));
        assert!(is_allowed_content_type("IMAGE/PNG", &allowed()));
        assert!(is_allowed_content_type("image/jpeg; charset=binary", &allowed()));
    }

    #[test]
    fn test_rejected_content_types() {
        assert!(!is_allowed_content_type("image/gif", &allowed()));
        assert!(!is_allowed_content_type("application/octet-stream", &allowed()));
        assert!(!is_allowed_content_type("", &allowed()));
    }

    #[test]
    fn test_too_large_message() {
        assert_eq!(too_large_message(20 * 1024 * 1024), "File too large (max 20MB)");
        assert_eq!(too_large_message(5 * 1024 * 1024), "File too large (max 5MB)");
    }
}
