//! Infrastructure layer - storage, detection and delivery implementations

pub mod api_key;
pub mod card;
pub mod detection;
pub mod logging;
pub mod services;
pub mod storage;
pub mod temp_store;
pub mod webhook;
