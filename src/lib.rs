//! Print Guard API
//!
//! Detects 3D-print failures in uploaded photos and keeps the latest
//! verdict per card:
//! - YOLO object detection through ONNX Runtime
//! - Short-lived per-card API keys for unattended uploaders
//! - Session-scoped result images with automatic expiry
//! - Optional result callbacks

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api::state::AppState;
use domain::detection::Detector;
use infrastructure::{
    api_key::ApiKeyService,
    detection::OnnxYoloDetector,
    services::CardService,
    storage::StorageFactory,
    temp_store::TempStore,
    webhook::HttpCallbackNotifier,
};
use tracing::info;

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let detector: Arc<dyn Detector> = Arc::new(
        OnnxYoloDetector::load(&config.detection).context("Failed to load detection model")?,
    );
    create_app_state_with_detector(config, detector).await
}

/// Create the application state around an already loaded detector
pub async fn create_app_state_with_detector(
    config: &AppConfig,
    detector: Arc<dyn Detector>,
) -> anyhow::Result<AppState> {
    info!("Storage backend: {}", config.storage.backend);
    let repositories = StorageFactory::create(&config.storage)
        .await
        .context("Failed to open storage")?;

    let temp_store = TempStore::new(
        config.temp.root_dir(),
        Duration::from_secs(config.temp.ttl_secs),
    )
    .await
    .context("Failed to prepare temp directory")?;

    let api_keys = ApiKeyService::new(repositories.api_keys)
        .with_ttl(chrono::Duration::seconds(config.api_keys.ttl_secs))
        .with_single_use(config.api_keys.single_use);

    let card_service = CardService::new(
        repositories.cards,
        api_keys,
        detector,
        temp_store.clone(),
    );

    let notifier = HttpCallbackNotifier::new(Duration::from_secs(config.webhook.timeout_secs))?;

    info!(model = %config.detection.model_name(), "Application state ready");

    Ok(AppState::new(
        Arc::new(card_service),
        temp_store,
        Arc::new(notifier),
        config.clone(),
    ))
}
