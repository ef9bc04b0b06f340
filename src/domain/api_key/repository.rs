//! API Key repository trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::entity::ApiKey;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository trait for API key storage
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    /// Store a new API key
    async fn create(&self, api_key: &ApiKey) -> Result<(), DomainError>;

    /// Look up a key by the hash of its secret
    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, DomainError>;

    /// Flag a key as consumed. Returns `true` only for the call that
    /// flipped the flag; concurrent callers race on a single winner.
    async fn try_mark_used(&self, key_hash: &str) -> Result<bool, DomainError>;

    /// Remove keys that expired before `before`, returning how many were removed
    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, DomainError>;
}
