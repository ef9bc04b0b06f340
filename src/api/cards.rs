//! Card endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use tracing::{debug, info};

use crate::api::middleware::{ensure_session, RequireAnyCardKey, RequireCardKey};
use crate::api::state::AppState;
use crate::api::types::{
    ApiError, ApiKeyResponse, CardListResponse, GenCardResponse, ImageForm, ListCardsQuery, Query,
};
use crate::domain::card::{Card, CardId};
use crate::infrastructure::webhook::spawn_callback;

pub const CALLBACK_URL_HEADER: &str = "x-callback-url";

const CARD_NOT_FOUND: &str = "Card not found";

pub fn create_cards_router() -> Router<AppState> {
    Router::new()
        .route("/cards", post(create_card).get(list_cards))
        .route("/cards/replace", post(replace_by_key))
        .route("/cards/genkey", post(gen_key))
        .route("/cards/gen_card", post(gen_card))
        .route("/cards/gen_cardkey", post(gen_card_key))
        .route("/cards/{card_id}", get(get_card))
        .route("/cards/{card_id}/apikey", post(issue_api_key))
        .route("/cards/{card_id}/replace", post(replace_card))
}

/// POST /cards
pub async fn create_card(
    State(state): State<AppState>,
    jar: CookieJar,
    ImageForm(upload): ImageForm,
) -> Result<(StatusCode, CookieJar, Json<Card>), ApiError> {
    let (jar, session) = ensure_session(jar, &state.config.session);
    let card_id = state.card_service.allocate_card_id().await?;

    debug!(card_id = %card_id, "Creating card from upload");

    let card = state
        .card_service
        .detect_and_store(&card_id, &session, upload, false)
        .await?;

    Ok((StatusCode::CREATED, jar, Json(card)))
}

/// POST /cards/{card_id}/replace
pub async fn replace_card(
    State(state): State<AppState>,
    RequireCardKey { card_id, api_key }: RequireCardKey,
    jar: CookieJar,
    headers: HeaderMap,
    ImageForm(upload): ImageForm,
) -> Result<(CookieJar, Json<Card>), ApiError> {
    let (jar, session) = ensure_session(jar, &state.config.session);

    let card = state
        .card_service
        .detect_and_store(&card_id, &session, upload, false)
        .await?;
    state.card_service.consume_key(&api_key).await?;

    notify_callback(&state, &headers, &card);

    Ok((jar, Json(card)))
}

/// POST /cards/replace
///
/// The card is whichever one the key was issued for. The result URL gets a
/// cache-busting query so clients polling a fixed card see the new image.
pub async fn replace_by_key(
    State(state): State<AppState>,
    RequireAnyCardKey(api_key): RequireAnyCardKey,
    jar: CookieJar,
    headers: HeaderMap,
    ImageForm(upload): ImageForm,
) -> Result<(CookieJar, Json<Card>), ApiError> {
    let (jar, session) = ensure_session(jar, &state.config.session);
    let card_id = api_key.card_id().clone();

    let card = state
        .card_service
        .detect_and_store(&card_id, &session, upload, true)
        .await?;
    state.card_service.consume_key(&api_key).await?;

    notify_callback(&state, &headers, &card);

    Ok((jar, Json(card)))
}

/// GET /cards
pub async fn list_cards(
    State(state): State<AppState>,
    Query(query): Query<ListCardsQuery>,
) -> Result<Json<CardListResponse>, ApiError> {
    let items = state.card_service.list(query.effective_limit()).await?;

    Ok(Json(CardListResponse {
        items,
        next_cursor: None,
    }))
}

/// GET /cards/{card_id}
pub async fn get_card(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<Card>, ApiError> {
    let card_id = parse_card_id(card_id)?;

    let card = state
        .card_service
        .get(&card_id)
        .await?
        .ok_or_else(|| ApiError::not_found(CARD_NOT_FOUND))?;

    Ok(Json(card))
}

/// POST /cards/{card_id}/apikey
pub async fn issue_api_key(
    State(state): State<AppState>,
    Path(card_id): Path<String>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let card_id = parse_card_id(card_id)?;

    let issued = state.card_service.issue_key(&card_id).await?;
    info!(card_id = %card_id, "API key issued");

    Ok(Json(ApiKeyResponse::from(issued)))
}

/// POST /cards/genkey
pub async fn gen_key(State(state): State<AppState>) -> Result<Json<ApiKeyResponse>, ApiError> {
    reserve_with_key(&state).await
}

/// POST /cards/gen_cardkey
pub async fn gen_card_key(
    State(state): State<AppState>,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    reserve_with_key(&state).await
}

/// POST /cards/gen_card
pub async fn gen_card(State(state): State<AppState>) -> Result<Json<GenCardResponse>, ApiError> {
    let card = state.card_service.reserve().await?;

    Ok(Json(GenCardResponse {
        card_id: card.card_id.to_string(),
        message: "Card created and ready for upload".to_string(),
    }))
}

async fn reserve_with_key(state: &AppState) -> Result<Json<ApiKeyResponse>, ApiError> {
    let (card, issued) = state.card_service.reserve_with_key().await?;
    info!(card_id = %card.card_id, "Card reserved with key");

    Ok(Json(ApiKeyResponse::from(issued)))
}

pub(crate) fn parse_card_id(raw: String) -> Result<CardId, ApiError> {
    CardId::new(raw).map_err(|e| ApiError::bad_request(format!("Invalid card id: {}", e)))
}

fn notify_callback(state: &AppState, headers: &HeaderMap, card: &Card) {
    let Some(url) = headers
        .get(CALLBACK_URL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|url| !url.is_empty())
    else {
        return;
    };

    spawn_callback(Arc::clone(&state.notifier), url.to_string(), card.clone());
}
