//! Request and response bodies for the card endpoints

use serde::{Deserialize, Serialize};

use crate::domain::api_key::IssuedApiKey;
use crate::domain::card::Card;

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ListCardsQuery {
    pub limit: Option<usize>,
    /// Accepted for forward compatibility; pagination is not implemented
    pub cursor: Option<String>,
}

impl ListCardsQuery {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CardListResponse {
    pub items: Vec<Card>,
    pub next_cursor: Option<String>,
}

/// A freshly issued key. The plaintext appears here and nowhere else.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiKeyResponse {
    pub card_id: String,
    pub api_key: String,
    /// Fractional epoch seconds
    pub expires_at: f64,
}

impl From<IssuedApiKey> for ApiKeyResponse {
    fn from(issued: IssuedApiKey) -> Self {
        Self {
            card_id: issued.api_key.card_id().to_string(),
            expires_at: issued.api_key.expires_at_epoch(),
            api_key: issued.secret,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenCardResponse {
    pub card_id: String,
    pub message: String,
}
