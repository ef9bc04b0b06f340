//! Card entity and related types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::validation::{validate_card_id, CardValidationError};

/// Card identifier - short opaque token
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardId(String);

impl CardId {
    /// Number of random bytes behind a generated ID (rendered as hex)
    pub const GENERATED_BYTES: usize = 4;

    /// Create a new CardId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, CardValidationError> {
        let id = id.into();
        validate_card_id(&id)?;
        Ok(Self(id))
    }

    /// Generate a fresh random ID, e.g. `"9f86d081"`
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::GENERATED_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CardId {
    type Error = CardValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CardId> for String {
    fn from(id: CardId) -> Self {
        id.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of the latest detection run for a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CardStatus {
    /// Reserved, no image processed yet
    #[default]
    #[serde(rename = "PENDING")]
    Pending,
    /// Print looks healthy
    #[serde(rename = "NORMAL")]
    Normal,
    /// Failure class detected above the threshold
    #[serde(rename = "FAIL")]
    Fail,
    /// Nothing resembling a print was detected
    #[serde(rename = "NOT_3DPRINT_PART")]
    NotPrintPart,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Normal => "NORMAL",
            Self::Fail => "FAIL",
            Self::NotPrintPart => "NOT_3DPRINT_PART",
        }
    }

    /// Parse a stored status; unknown values fall back to `Pending`
    pub fn from_db(value: &str) -> Self {
        match value {
            "NORMAL" => Self::Normal,
            "FAIL" => Self::Fail,
            "NOT_3DPRINT_PART" => Self::NotPrintPart,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for CardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-label maximum confidence
pub type Scores = BTreeMap<String, f32>;

/// A detection subject and its latest result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub card_id: CardId,
    pub detected_image_url: String,
    pub status: CardStatus,
    #[serde(default)]
    pub scores: Scores,
    pub updated_at: DateTime<Utc>,
    pub model: String,
}

impl Card {
    /// An empty card reserved for a later upload
    pub fn pending(card_id: CardId, model: impl Into<String>) -> Self {
        Self {
            card_id,
            detected_image_url: String::new(),
            status: CardStatus::Pending,
            scores: Scores::new(),
            updated_at: Utc::now(),
            model: model.into(),
        }
    }

    /// A card carrying a fresh detection result
    pub fn detected(
        card_id: CardId,
        detected_image_url: impl Into<String>,
        status: CardStatus,
        scores: Scores,
        model: impl Into<String>,
    ) -> Self {
        Self {
            card_id,
            detected_image_url: detected_image_url.into(),
            status,
            scores,
            updated_at: Utc::now(),
            model: model.into(),
        }
    }
}
