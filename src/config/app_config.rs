use std::path::PathBuf;

use serde::Deserialize;

use crate::domain::DetectionRules;
use crate::infrastructure::api_key::DEFAULT_API_KEY_TTL_SECS;
use crate::infrastructure::temp_store::DEFAULT_TEMP_TTL;
use crate::infrastructure::webhook::DEFAULT_CALLBACK_TIMEOUT_SECS;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
    pub temp: TempConfig,
    pub api_keys: ApiKeyConfig,
    pub session: SessionConfig,
    pub detection: DetectionConfig,
    pub webhook: WebhookConfig,
    pub frontend: FrontendConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Where cards and API keys live
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `sqlite` or `memory`
    pub backend: String,
    pub database_url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
    pub allowed_mime: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TempConfig {
    /// Root directory for session folders; defaults to `<system tmp>/3dprint_tmp`
    pub root: Option<PathBuf>,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiKeyConfig {
    pub ttl_secs: i64,
    /// Burn a key after one successful replace
    pub single_use: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub max_age_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub model_path: PathBuf,
    pub input_size: u32,
    pub intra_threads: usize,
    /// TTF/OTF font used for box captions; captions are skipped without one
    pub font_path: Option<PathBuf>,
    #[serde(flatten)]
    pub rules: DetectionRules,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    pub static_dir: PathBuf,
    pub index_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `*` allows any origin
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            database_url: "sqlite://data/database.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 20 * 1024 * 1024,
            allowed_mime: vec!["image/jpeg".to_string(), "image/png".to_string()],
        }
    }
}

impl Default for TempConfig {
    fn default() -> Self {
        Self {
            root: None,
            ttl_secs: DEFAULT_TEMP_TTL.as_secs(),
        }
    }
}

impl TempConfig {
    pub fn root_dir(&self) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("3dprint_tmp"))
    }
}

impl Default for ApiKeyConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_API_KEY_TTL_SECS,
            single_use: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session_id".to_string(),
            max_age_secs: 60 * 60 * 24 * 30,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/best.onnx"),
            input_size: 640,
            intra_threads: 4,
            font_path: None,
            rules: DetectionRules::default(),
        }
    }
}

impl DetectionConfig {
    /// Basename of the model file, reported on every card
    pub fn model_name(&self) -> String {
        self.model_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_CALLBACK_TIMEOUT_SECS,
        }
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            static_dir: PathBuf::from("frontend/static"),
            index_file: PathBuf::from("frontend/index.html"),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("uploads.allowed_mime")
                    .with_list_parse_key("cors.allowed_origins")
                    .with_list_parse_key("detection.classes")
                    .with_list_parse_key("detection.labels")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8000);
        assert_eq!(config.uploads.max_bytes, 20 * 1024 * 1024);
        assert_eq!(config.api_keys.ttl_secs, 3600);
        assert!(!config.api_keys.single_use);
        assert_eq!(config.temp.ttl_secs, 86_400);
        assert_eq!(config.session.cookie_name, "session_id");
        assert_eq!(config.detection.rules.conf_threshold, 0.2);
    }

    #[test]
    fn test_model_name_is_basename() {
        let config = DetectionConfig {
            model_path: PathBuf::from("/opt/models/best.onnx"),
            ..Default::default()
        };

        assert_eq!(config.model_name(), "best.onnx");
    }

    #[test]
    fn test_temp_root_default() {
        let config = TempConfig::default();
        assert!(config.root_dir().ends_with("3dprint_tmp"));
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "server": { "port": 9000 },
            "detection": { "conf_threshold": 0.5, "model_path": "m.onnx" }
        }))
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.detection.rules.conf_threshold, 0.5);
        assert_eq!(config.detection.rules.fail_label, "spaghetti");
        assert_eq!(config.detection.model_name(), "m.onnx");
    }
}
