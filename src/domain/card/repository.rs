//! Card repository trait

use async_trait::async_trait;

use super::entity::{Card, CardId};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository for card persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Inserts the card or overwrites the existing row with the same ID
    async fn upsert(&self, card: &Card) -> Result<(), DomainError>;

    /// Finds a card by ID
    async fn get(&self, id: &CardId) -> Result<Option<Card>, DomainError>;

    /// Lists cards, most recently updated first
    async fn list(&self, limit: usize) -> Result<Vec<Card>, DomainError>;

    /// Checks whether a card exists
    async fn exists(&self, id: &CardId) -> Result<bool, DomainError> {
        Ok(self.get(id).await?.is_some())
    }
}
