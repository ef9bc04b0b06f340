//! API key entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::card::CardId;

/// A stored API key: only the hash of the secret is kept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKey {
    key_hash: String,
    card_id: CardId,
    expires_at: DateTime<Utc>,
    used: bool,
}

impl ApiKey {
    /// Create a key scoped to `card_id` that lives for `ttl`
    pub fn new(key_hash: impl Into<String>, card_id: CardId, ttl: Duration) -> Self {
        Self {
            key_hash: key_hash.into(),
            card_id,
            expires_at: Utc::now() + ttl,
            used: false,
        }
    }

    /// Rebuild a key from stored state
    pub fn restore(
        key_hash: impl Into<String>,
        card_id: CardId,
        expires_at: DateTime<Utc>,
        used: bool,
    ) -> Self {
        Self {
            key_hash: key_hash.into(),
            card_id,
            expires_at,
            used,
        }
    }

    pub fn key_hash(&self) -> &str {
        &self.key_hash
    }

    pub fn card_id(&self) -> &CardId {
        &self.card_id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn mark_used(&mut self) {
        self.used = true;
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Not expired and not yet consumed
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now) && !self.used
    }

    /// Expiry as fractional epoch seconds, the wire format for `expires_at`
    pub fn expires_at_epoch(&self) -> f64 {
        self.expires_at.timestamp_micros() as f64 / 1_000_000.0
    }
}

/// A freshly issued key: the plaintext is only available here
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub secret: String,
    pub api_key: ApiKey,
}
