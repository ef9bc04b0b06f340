//! Health check endpoints for liveness and readiness probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use super::state::AppState;

/// Detailed health response with component status
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Health check status
#[derive(Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health check
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Process is up; reports the build version
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Readiness check: card store reachable and detection model loaded
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();

    let cards_check = check_card_service(&state).await;
    let temp_check = check_temp_store(&state).await;

    let overall_status = if cards_check.status == HealthStatus::Healthy {
        if temp_check.status == HealthStatus::Healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        }
    } else {
        HealthStatus::Unhealthy
    };

    let latency = start.elapsed().as_millis() as u64;
    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(vec![cards_check, temp_check]),
        latency_ms: Some(latency),
    };

    let status_code = match overall_status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

fn component(name: &str, failure: Option<String>, start: Instant) -> HealthCheck {
    HealthCheck {
        name: name.to_string(),
        status: if failure.is_none() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        },
        message: failure,
        latency_ms: Some(start.elapsed().as_millis() as u64),
    }
}

async fn check_card_service(state: &AppState) -> HealthCheck {
    let start = Instant::now();
    let failure = (!state.card_service.is_ready().await)
        .then(|| "Card store or detection model unavailable".to_string());

    component("card_service", failure, start)
}

async fn check_temp_store(state: &AppState) -> HealthCheck {
    let start = Instant::now();
    let failure = match tokio::fs::metadata(state.temp_store.root()).await {
        Ok(meta) if meta.is_dir() => None,
        Ok(_) => Some("Temp root is not a directory".to_string()),
        Err(e) => Some(format!("Temp root unavailable: {}", e)),
    };

    component("temp_store", failure, start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{read_json, TestApp};
    use crate::domain::detection::MockDetector;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn ready(app: &TestApp) -> axum::response::Response {
        app.router()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_ready_when_store_and_model_are_up() {
        let app = TestApp::new().await;

        let response = ready(&app).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"][0]["name"], "card_service");
        assert_eq!(body["checks"][1]["name"], "temp_store");
        assert!(body["checks"][0].get("message").is_none());
    }

    #[tokio::test]
    async fn test_not_ready_without_model() {
        let mut detector = MockDetector::new();
        detector.expect_model_name().return_const("best.onnx".to_string());
        detector.expect_is_ready().return_const(false);
        let app = TestApp::with_detector(detector).await;

        let response = ready(&app).await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = read_json(response).await;
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(
            body["checks"][0]["message"],
            "Card store or detection model unavailable"
        );
    }

    #[tokio::test]
    async fn test_missing_temp_root_degrades() {
        let app = TestApp::new().await;
        tokio::fs::remove_dir_all(app.state.temp_store.root())
            .await
            .unwrap();

        let response = ready(&app).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"][1]["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_live_and_health() {
        let app = TestApp::new().await;

        for uri in ["/live", "/health"] {
            let response = app
                .router()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
