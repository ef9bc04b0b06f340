//! SQLite API key repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::api_key::{ApiKey, ApiKeyRepository};
use crate::domain::card::CardId;
use crate::domain::DomainError;

/// SQLite implementation of ApiKeyRepository.
///
/// `expires_at` is stored as fractional epoch seconds.
#[derive(Debug, Clone)]
pub struct SqliteApiKeyRepository {
    pool: SqlitePool,
}

impl SqliteApiKeyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn epoch_to_datetime(epoch: f64) -> Result<DateTime<Utc>, DomainError> {
    DateTime::from_timestamp_micros((epoch * 1_000_000.0).round() as i64)
        .ok_or_else(|| DomainError::storage(format!("Invalid expiry in database: {}", epoch)))
}

fn datetime_to_epoch(at: DateTime<Utc>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

#[async_trait]
impl ApiKeyRepository for SqliteApiKeyRepository {
    async fn create(&self, api_key: &ApiKey) -> Result<(), DomainError> {
        sqlx::query("INSERT INTO apikeys (api_key, card_id, expires_at, used) VALUES (?, ?, ?, ?)")
            .bind(api_key.key_hash())
            .bind(api_key.card_id().as_str())
            .bind(api_key.expires_at_epoch())
            .bind(api_key.is_used() as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    DomainError::conflict("API key already exists")
                }
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    DomainError::not_found(format!(
                        "Card '{}' not found",
                        api_key.card_id()
                    ))
                }
                other => DomainError::storage(format!("Failed to create API key: {}", other)),
            })?;

        Ok(())
    }

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, DomainError> {
        let row = sqlx::query(
            "SELECT api_key, card_id, expires_at, used FROM apikeys WHERE api_key = ?",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get API key: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let card_id: String = row.get("card_id");
        let card_id = CardId::new(&card_id)
            .map_err(|e| DomainError::storage(format!("Invalid card ID in database: {}", e)))?;
        let expires_at = epoch_to_datetime(row.get("expires_at"))?;
        let used: i64 = row.get("used");

        Ok(Some(ApiKey::restore(
            row.get::<String, _>("api_key"),
            card_id,
            expires_at,
            used != 0,
        )))
    }

    async fn try_mark_used(&self, key_hash: &str) -> Result<bool, DomainError> {
        let result = sqlx::query("UPDATE apikeys SET used = 1 WHERE api_key = ? AND used = 0")
            .bind(key_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to mark API key used: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_expired(&self, before: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM apikeys WHERE expires_at < ?")
            .bind(datetime_to_epoch(before))
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to purge API keys: {}", e)))?;

        Ok(result.rows_affected())
    }
}
