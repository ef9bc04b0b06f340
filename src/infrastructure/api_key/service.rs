//! API Key service
//!
//! Issues, validates and consumes per-card API keys.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};

use crate::domain::api_key::{ApiKey, ApiKeyRepository, IssuedApiKey};
use crate::domain::card::CardId;
use crate::domain::DomainError;

use super::generator::ApiKeyGenerator;

/// Default key lifetime in seconds
pub const DEFAULT_API_KEY_TTL_SECS: i64 = 3600;

/// API Key service for managing card keys
#[derive(Debug)]
pub struct ApiKeyService<R>
where
    R: ApiKeyRepository + ?Sized,
{
    repository: Arc<R>,
    generator: ApiKeyGenerator,
    ttl: Duration,
    single_use: bool,
}

impl<R: ApiKeyRepository + ?Sized> ApiKeyService<R> {
    /// Create a new API key service
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            generator: ApiKeyGenerator::default(),
            ttl: Duration::seconds(DEFAULT_API_KEY_TTL_SECS),
            single_use: false,
        }
    }

    /// Set how long issued keys stay valid
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Consume keys after their first successful replace
    pub fn with_single_use(mut self, single_use: bool) -> Self {
        self.single_use = single_use;
        self
    }

    /// Issue a new key for a card. The plaintext secret is only returned here.
    pub async fn issue(&self, card_id: &CardId) -> Result<IssuedApiKey, DomainError> {
        let generated = self.generator.generate();
        let api_key = ApiKey::new(&generated.hash, card_id.clone(), self.ttl);

        self.repository.create(&api_key).await?;

        info!(card_id = %card_id, "API key issued");

        Ok(IssuedApiKey {
            secret: generated.key,
            api_key,
        })
    }

    /// Resolve a plaintext key to its stored record.
    ///
    /// Returns `None` for unknown, expired or consumed keys. With single-use
    /// enabled a successful resolve also consumes the key.
    pub async fn resolve(&self, secret: &str) -> Result<Option<ApiKey>, DomainError> {
        match self.lookup(secret).await? {
            Some(key) => self.claim(key).await,
            None => Ok(None),
        }
    }

    /// Resolve a key and check it belongs to `card_id`
    pub async fn verify(
        &self,
        secret: &str,
        card_id: &CardId,
    ) -> Result<Option<ApiKey>, DomainError> {
        match self.lookup(secret).await? {
            Some(key) if key.card_id() == card_id => self.claim(key).await,
            Some(key) => {
                debug!(card_id = %key.card_id(), requested = %card_id, "API key bound to another card");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Record a successful use. Only marks the key when single-use is enabled;
    /// a key already claimed during verification stays as it is.
    pub async fn consume(&self, key: &ApiKey) -> Result<(), DomainError> {
        if !self.single_use {
            return Ok(());
        }

        if let Err(e) = self.repository.try_mark_used(key.key_hash()).await {
            warn!("Failed to mark API key as used: {}", e);
            return Err(e);
        }

        Ok(())
    }

    async fn lookup(&self, secret: &str) -> Result<Option<ApiKey>, DomainError> {
        let hash = ApiKeyGenerator::hash_key(secret);

        let Some(key) = self.repository.find_by_hash(&hash).await? else {
            debug!("API key not found");
            return Ok(None);
        };

        if !key.is_usable_at(Utc::now()) {
            debug!(card_id = %key.card_id(), used = key.is_used(), "API key is not usable");
            return Ok(None);
        }

        Ok(Some(key))
    }

    /// Single-use keys are flipped to used here; only one caller wins
    async fn claim(&self, mut key: ApiKey) -> Result<Option<ApiKey>, DomainError> {
        if !self.single_use {
            return Ok(Some(key));
        }

        if !self.repository.try_mark_used(key.key_hash()).await? {
            debug!(card_id = %key.card_id(), "Single-use API key already consumed");
            return Ok(None);
        }

        key.mark_used();
        Ok(Some(key))
    }

    /// Drop expired keys from storage
    pub async fn purge_expired(&self) -> Result<u64, DomainError> {
        let removed = self.repository.delete_expired(Utc::now()).await?;
        if removed > 0 {
            info!(removed, "Purged expired API keys");
        }
        Ok(removed)
    }
}
