//! HTTP request/response types and extractors

pub mod card;
pub mod error;
pub mod query;
pub mod upload;

pub use card::{ApiKeyResponse, CardListResponse, GenCardResponse, ListCardsQuery};
pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use query::Query;
pub use upload::{ImageForm, IMAGE_FIELD};
