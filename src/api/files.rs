//! Serving rendered results out of the temp store

use std::io::ErrorKind;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;

const RESULT_GONE: &str = "result not found or expired";

/// GET /temp/results/{sid}/{filename}
pub async fn serve_result(
    State(state): State<AppState>,
    Path((sid, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let path = state
        .temp_store
        .resolve(&sid, &filename)
        .await?
        .ok_or_else(|| ApiError::not_found(RESULT_GONE))?;

    // The reaper may delete the file between lookup and read.
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(ApiError::not_found(RESULT_GONE)),
        Err(e) => return Err(crate::domain::DomainError::from(e).into()),
    };

    debug!(path = %path.display(), size = bytes.len(), "Serving result");

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let content_type = HeaderValue::from_str(mime.as_ref())
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
            ),
            (header::PRAGMA, HeaderValue::from_static("no-cache")),
            (header::EXPIRES, HeaderValue::from_static("0")),
        ],
        bytes,
    )
        .into_response())
}
