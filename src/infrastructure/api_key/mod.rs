//! API Key infrastructure
//!
//! Key generation, storage backends and the key service.

mod generator;
mod repository;
mod service;
mod sqlite_repository;

pub use generator::{ApiKeyGenerator, GeneratedApiKey};
pub use repository::InMemoryApiKeyRepository;
pub use service::{ApiKeyService, DEFAULT_API_KEY_TTL_SECS};
pub use sqlite_repository::SqliteApiKeyRepository;
