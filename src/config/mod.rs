//! Application configuration

mod app_config;

pub use app_config::{
    ApiKeyConfig, AppConfig, CorsConfig, DetectionConfig, FrontendConfig, LogFormat,
    LoggingConfig, ServerConfig, SessionConfig, StorageConfig, TempConfig, UploadConfig,
    WebhookConfig,
};
