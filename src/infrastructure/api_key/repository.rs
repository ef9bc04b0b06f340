//! In-memory API key repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::api_key::{ApiKey, ApiKeyRepository};
use crate::domain::DomainError;

/// In-memory implementation of ApiKeyRepository, keyed by secret hash
#[derive(Debug, Default)]
pub struct InMemoryApiKeyRepository {
    keys: Arc<RwLock<HashMap<String, ApiKey>>>,
}

impl InMemoryApiKeyRepository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn create(&self, api_key: &ApiKey) -> Result<(), DomainError> {
        let mut keys = self.keys.write().await;

        if keys.contains_key(api_key.key_hash()) {
            return Err(DomainError::conflict("API key already exists"));
        }

        keys.insert(api_key.key_hash().to_string(), api_key.clone());
        Ok(())
    }

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, DomainError> {
        let keys = self.keys.read().await;
        Ok(keys.get(key_hash).cloned())
    }

    async fn try_mark_used(&self, key_hash: &str) -> Result<bool, DomainError> {
        let mut keys = self.keys.write().await;

        match keys.get_mut(key_hash) {
            Some(key) if !key.is_used() => {
                key.mark_used();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, DomainError> {
        let mut keys = self.keys.write().await;
        let initial = keys.len();

        keys.retain(|_, key| !key.is_expired_at(before));

        Ok((initial - keys.len()) as u64)
    }
}
