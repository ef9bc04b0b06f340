//! Result callback contract

use async_trait::async_trait;

use crate::domain::card::Card;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Delivers a card result to an integrator-supplied URL
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CallbackNotifier: Send + Sync {
    /// POST the card as JSON to `url`; a single attempt, no retries
    async fn notify(&self, url: &str, card: &Card) -> Result<(), DomainError>;
}
