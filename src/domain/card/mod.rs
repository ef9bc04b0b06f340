//! Card domain
//!
//! A card is the unit integrators track: one detection subject and its
//! latest result.

mod entity;
mod repository;
mod validation;

pub use entity::{Card, CardId, CardStatus, Scores};
pub use repository::CardRepository;
#[cfg(test)]
pub use repository::MockCardRepository;
pub use validation::{validate_card_id, CardValidationError};
