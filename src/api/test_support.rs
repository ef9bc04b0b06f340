//! Shared fixtures for router tests

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;

use crate::api::router::create_router_with_state;
use crate::api::state::AppState;
use crate::config::AppConfig;
use crate::domain::card::{CardStatus, Scores};
use crate::domain::detection::{DetectionError, DetectionOutcome, MockDetector};
use crate::domain::webhook::MockCallbackNotifier;
use crate::infrastructure::api_key::{ApiKeyService, InMemoryApiKeyRepository};
use crate::infrastructure::card::InMemoryCardRepository;
use crate::infrastructure::services::CardService;
use crate::infrastructure::temp_store::TempStore;

const BOUNDARY: &str = "print-guard-test-boundary";

pub struct TestApp {
    pub state: AppState,
    _dir: tempfile::TempDir,
}

struct Options {
    detector: MockDetector,
    notifier: MockCallbackNotifier,
    max_bytes: Option<usize>,
    temp_ttl: Duration,
    key_ttl: Option<chrono::Duration>,
    single_use: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            detector: fail_detector(),
            notifier: MockCallbackNotifier::new(),
            max_bytes: None,
            temp_ttl: Duration::from_secs(60),
            key_ttl: None,
            single_use: false,
        }
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(Options::default()).await
    }

    pub async fn with_detector(detector: MockDetector) -> Self {
        Self::build(Options {
            detector,
            ..Options::default()
        })
        .await
    }

    pub async fn with_notifier(notifier: MockCallbackNotifier) -> Self {
        Self::build(Options {
            notifier,
            ..Options::default()
        })
        .await
    }

    pub async fn with_max_bytes(max_bytes: usize) -> Self {
        Self::build(Options {
            max_bytes: Some(max_bytes),
            ..Options::default()
        })
        .await
    }

    pub async fn with_temp_ttl(temp_ttl: Duration) -> Self {
        Self::build(Options {
            temp_ttl,
            ..Options::default()
        })
        .await
    }

    /// Keys issued by this app live for `key_ttl` (negative means born expired)
    pub async fn with_key_ttl(key_ttl: chrono::Duration) -> Self {
        Self::build(Options {
            key_ttl: Some(key_ttl),
            ..Options::default()
        })
        .await
    }

    pub async fn with_single_use_keys() -> Self {
        Self::build(Options {
            single_use: true,
            ..Options::default()
        })
        .await
    }

    async fn build(options: Options) -> Self {
        let dir = tempfile::tempdir().unwrap();

        let mut config = AppConfig::default();
        config.temp.root = Some(dir.path().join("tmp"));
        config.frontend.static_dir = dir.path().join("static");
        config.frontend.index_file = dir.path().join("index.html");
        if let Some(max_bytes) = options.max_bytes {
            config.uploads.max_bytes = max_bytes;
        }

        let temp_store = TempStore::new(config.temp.root_dir(), options.temp_ttl)
            .await
            .unwrap();

        let mut api_keys = ApiKeyService::new(Arc::new(InMemoryApiKeyRepository::new()))
            .with_single_use(options.single_use);
        if let Some(ttl) = options.key_ttl {
            api_keys = api_keys.with_ttl(ttl);
        }

        let card_service = CardService::new(
            Arc::new(InMemoryCardRepository::new()),
            api_keys,
            Arc::new(options.detector),
            temp_store.clone(),
        );

        let state = AppState::new(
            Arc::new(card_service),
            temp_store,
            Arc::new(options.notifier),
            config,
        );

        Self { state, _dir: dir }
    }

    pub fn router(&self) -> Router {
        create_router_with_state(self.state.clone())
    }
}

/// Detector that flags every image as a failed print
pub fn fail_detector() -> MockDetector {
    let mut detector = MockDetector::new();
    detector.expect_model_name().return_const("best.onnx".to_string());
    detector.expect_is_ready().return_const(true);
    detector.expect_detect().returning(|_| {
        Ok(DetectionOutcome {
            status: CardStatus::Fail,
            scores: Scores::from([("spaghetti".to_string(), 0.91)]),
            detections: Vec::new(),
            annotated_jpeg: vec![0xFF, 0xD8, 0xFF, 0xD9],
        })
    });
    detector
}

/// Detector that cannot decode anything
pub fn failing_detector() -> MockDetector {
    let mut detector = MockDetector::new();
    detector.expect_model_name().return_const("best.onnx".to_string());
    detector.expect_is_ready().return_const(true);
    detector
        .expect_detect()
        .returning(|_| Err(DetectionError::Decode("unsupported format".to_string())));
    detector
}

/// `(content type header, body)` for a single-file multipart form
pub fn multipart_body(field: &str, content_type: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"print.jpg\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

/// POST an `image` field to `uri`
pub fn multipart_request(uri: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let (header, body) = multipart_body("image", content_type, bytes);
    Request::post(uri)
        .header(CONTENT_TYPE, header)
        .body(Body::from(body))
        .unwrap()
}

pub async fn read_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
