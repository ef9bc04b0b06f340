//! In-memory card repository implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::card::{Card, CardId, CardRepository};
use crate::domain::DomainError;

/// In-memory implementation of CardRepository
#[derive(Debug, Default)]
pub struct InMemoryCardRepository {
    cards: Arc<RwLock<HashMap<String, Card>>>,
}

impl InMemoryCardRepository {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardRepository for InMemoryCardRepository {
    async fn upsert(&self, card: &Card) -> Result<(), DomainError> {
        let mut cards = self.cards.write().await;
        cards.insert(card.card_id.as_str().to_string(), card.clone());
        Ok(())
    }

    async fn get(&self, id: &CardId) -> Result<Option<Card>, DomainError> {
        let cards = self.cards.read().await;
        Ok(cards.get(id.as_str()).cloned())
    }

    async fn list(&self, limit: usize) -> Result<Vec<Card>, DomainError> {
        let cards = self.cards.read().await;

        let mut result: Vec<Card> = cards.values().cloned().collect();
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);

        Ok(result)
    }

    async fn exists(&self, id: &CardId) -> Result<bool, DomainError> {
        let cards = self.cards.read().await;
        Ok(cards.contains_key(id.as_str()))
    }
}
