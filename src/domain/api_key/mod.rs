//! API Key domain
//!
//! Short-lived bearer tokens, each scoped to exactly one card.

mod entity;
mod repository;

pub use entity::{ApiKey, IssuedApiKey};
pub use repository::ApiKeyRepository;
#[cfg(test)]
pub use repository::MockApiKeyRepository;
