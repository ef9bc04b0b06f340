//! Card identifier validation

use thiserror::Error;

/// Errors that can occur during card ID validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CardValidationError {
    #[error("Card ID cannot be empty")]
    EmptyId,

    #[error("Card ID exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("Card ID contains invalid character: '{0}'. Only alphanumeric characters, hyphens and underscores are allowed")]
    InvalidCharacter(char),
}

const MAX_CARD_ID_LENGTH: usize = 64;

/// Validate a card ID
///
/// Rules:
/// - Cannot be empty
/// - Maximum 64 characters
/// - Only ASCII alphanumeric characters, hyphens and underscores
pub fn validate_card_id(id: &str) -> Result<(), CardValidationError> {
    if id.is_empty() {
        return Err(CardValidationError::EmptyId);
    }

    if id.len() > MAX_CARD_ID_LENGTH {
        return Err(CardValidationError::TooLong(MAX_CARD_ID_LENGTH));
    }

    if let Some(c) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(CardValidationError::InvalidCharacter(c));
    }

    Ok(())
}
