//! Domain layer - Core business logic and entities

pub mod api_key;
pub mod card;
pub mod detection;
pub mod error;
pub mod session;
pub mod webhook;

pub use api_key::{ApiKey, ApiKeyRepository, IssuedApiKey};
pub use card::{Card, CardId, CardRepository, CardStatus, CardValidationError, Scores};
pub use detection::{Detection, DetectionError, DetectionOutcome, DetectionRules, Detector};
pub use error::DomainError;
pub use session::{SessionId, SessionIdError};
pub use webhook::CallbackNotifier;
