//! Card API key extractors
//!
//! Both extractors read `X-Api-Key` and reject with 401 before the request
//! body is touched, so a bad key never costs an upload.

use axum::{
    extract::{FromRequestParts, Path},
    http::{request::Parts, HeaderMap},
};
use tracing::debug;

use crate::api::cards::parse_card_id;
use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::api_key::ApiKey;
use crate::domain::card::CardId;

pub const API_KEY_HEADER: &str = "x-api-key";

const MISSING_KEY: &str = "Missing API key";
const INVALID_KEY: &str = "API key expired/invalid";

/// A usable key bound to the card named in the path (`/cards/{card_id}/...`)
#[derive(Debug, Clone)]
pub struct RequireCardKey {
    pub card_id: CardId,
    pub api_key: ApiKey,
}

impl FromRequestParts<AppState> for RequireCardKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secret = extract_api_key_from_headers(&parts.headers)?;

        let Path(raw_id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::bad_request("Invalid card id"))?;

        let card_id = parse_card_id(raw_id)?;

        debug!(card_id = %card_id, "Validating card key");

        let api_key = state
            .card_service
            .verify_key(&secret, &card_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized(INVALID_KEY))?;

        Ok(Self { card_id, api_key })
    }
}

/// A usable key; the card is whichever one the key was issued for
#[derive(Debug, Clone)]
pub struct RequireAnyCardKey(pub ApiKey);

impl FromRequestParts<AppState> for RequireAnyCardKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let secret = extract_api_key_from_headers(&parts.headers)?;

        let api_key = state
            .card_service
            .resolve_key(&secret)
            .await?
            .ok_or_else(|| ApiError::unauthorized(INVALID_KEY))?;

        debug!(card_id = %api_key.card_id(), "Card resolved from key");

        Ok(Self(api_key))
    }
}

fn extract_api_key_from_headers(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(API_KEY_HEADER)
        .ok_or_else(|| ApiError::unauthorized(MISSING_KEY))?;

    let key = value
        .to_str()
        .map_err(|_| ApiError::unauthorized(INVALID_KEY))?
        .trim();

    if key.is_empty() {
        return Err(ApiError::unauthorized(MISSING_KEY));
    }

    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    #[test]
    fn test_extract_x_api_key() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Api-Key", HeaderValue::from_static(" abc123 "));

        assert_eq!(extract_api_key_from_headers(&headers).unwrap(), "abc123");
    }

    #[test]
    fn test_missing_header() {
        let err = extract_api_key_from_headers(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), MISSING_KEY);
    }

    #[test]
    fn test_blank_header_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("   "));

        let err = extract_api_key_from_headers(&headers).unwrap_err();
        assert_eq!(err.message(), MISSING_KEY);
    }

    #[test]
    fn test_non_ascii_header_is_invalid() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_bytes(b"k\xffey").unwrap());

        let err = extract_api_key_from_headers(&headers).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message(), INVALID_KEY);
    }
}
