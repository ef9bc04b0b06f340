//! SQLite card repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::domain::card::{Card, CardId, CardRepository, CardStatus, Scores};
use crate::domain::DomainError;

/// SQLite implementation of CardRepository
#[derive(Debug, Clone)]
pub struct SqliteCardRepository {
    pool: SqlitePool,
}

impl SqliteCardRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CardRepository for SqliteCardRepository {
    async fn upsert(&self, card: &Card) -> Result<(), DomainError> {
        let scores_json = serde_json::to_string(&card.scores)
            .map_err(|e| DomainError::internal(format!("Failed to serialize scores: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO cards (card_id, detected_image_url, status, scores_json, updated_at, model)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(card_id) DO UPDATE SET
                detected_image_url = excluded.detected_image_url,
                status = excluded.status,
                scores_json = excluded.scores_json,
                updated_at = excluded.updated_at,
                model = excluded.model
            "#,
        )
        .bind(card.card_id.as_str())
        .bind(&card.detected_image_url)
        .bind(card.status.as_str())
        .bind(scores_json)
        .bind(card.updated_at)
        .bind(&card.model)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to upsert card: {}", e)))?;

        Ok(())
    }

    async fn get(&self, id: &CardId) -> Result<Option<Card>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT card_id, detected_image_url, status, scores_json, updated_at, model
            FROM cards
            WHERE card_id = ?
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get card: {}", e)))?;

        match row {
            Some(row) => Ok(Some(row_to_card(&row)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, limit: usize) -> Result<Vec<Card>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT card_id, detected_image_url, status, scores_json, updated_at, model
            FROM cards
            ORDER BY updated_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list cards: {}", e)))?;

        rows.iter().map(row_to_card).collect()
    }

    async fn exists(&self, id: &CardId) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cards WHERE card_id = ?)")
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check card: {}", e)))?;

        Ok(exists)
    }
}

fn row_to_card(row: &sqlx::sqlite::SqliteRow) -> Result<Card, DomainError> {
    let card_id: String = row.get("card_id");
    let status: String = row.get("status");
    let scores_json: String = row.get("scores_json");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    let card_id = CardId::new(&card_id)
        .map_err(|e| DomainError::storage(format!("Invalid card ID in database: {}", e)))?;
    let scores: Scores = serde_json::from_str(&scores_json)
        .map_err(|e| DomainError::storage(format!("Invalid scores in database: {}", e)))?;

    Ok(Card {
        card_id,
        detected_image_url: row.get("detected_image_url"),
        status: CardStatus::from_db(&status),
        scores,
        updated_at,
        model: row.get("model"),
    })
}
