//! Infrastructure services

mod card_service;

pub use card_service::{CardService, CardServiceTrait, ImageUpload, RESULTS_URL_PREFIX};
