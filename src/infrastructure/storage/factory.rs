//! Storage factory for runtime storage selection

use std::sync::Arc;

use tracing::info;

use crate::config::StorageConfig;
use crate::domain::api_key::ApiKeyRepository;
use crate::domain::card::CardRepository;
use crate::domain::DomainError;
use crate::infrastructure::api_key::{InMemoryApiKeyRepository, SqliteApiKeyRepository};
use crate::infrastructure::card::{InMemoryCardRepository, SqliteCardRepository};

use super::migrations::run_storage_migrations;
use super::sqlite::connect;

/// Supported storage types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// SQLite database file
    Sqlite,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

/// The repositories backing the card service
#[derive(Clone)]
pub struct Repositories {
    pub cards: Arc<dyn CardRepository>,
    pub api_keys: Arc<dyn ApiKeyRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            cards: Arc::new(InMemoryCardRepository::new()),
            api_keys: Arc::new(InMemoryApiKeyRepository::new()),
        }
    }
}

/// Factory for creating storage instances
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Opens the configured backend, running migrations for SQLite
    pub async fn create(config: &StorageConfig) -> Result<Repositories, DomainError> {
        let storage_type = StorageType::from_str(&config.backend).ok_or_else(|| {
            DomainError::configuration(format!("Unknown storage backend: {}", config.backend))
        })?;

        match storage_type {
            StorageType::InMemory => {
                info!("Using in-memory storage");
                Ok(Repositories::in_memory())
            }
            StorageType::Sqlite => {
                let pool = connect(&config.database_url, config.max_connections).await?;
                run_storage_migrations(&pool).await?;

                Ok(Repositories {
                    cards: Arc::new(SqliteCardRepository::new(pool.clone())),
                    api_keys: Arc::new(SqliteApiKeyRepository::new(pool)),
                })
            }
        }
    }
}
