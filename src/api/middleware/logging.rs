//! Request/response logging with header redaction

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Log each request and its outcome. Spans come from `TraceLayer`; this
/// middleware only emits events inside them.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let path = extract_path(&request);
    let request_id = extract_request_id(&request);

    let headers_log = redact_headers(request.headers());

    info!(
        method = %method,
        path = %path,
        uri = %uri,
        request_id = %request_id,
        headers = %headers_log,
        "Incoming request"
    );

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    if status.is_server_error() {
        warn!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            request_id = %request_id,
            "Request failed"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            request_id = %request_id,
            "Request completed"
        );
    }

    response
}

/// Headers whose values never reach the log
const REDACTED_HEADERS: &[&str] = &[
    "authorization",
    "proxy-authorization",
    "x-api-key",
    "cookie",
    "set-cookie",
];

/// Headers worth logging at all; everything else is dropped
const LOGGED_HEADERS: &[&str] = &[
    "content-type",
    "content-length",
    "user-agent",
    "x-request-id",
    "x-forwarded-for",
    "x-real-ip",
    "x-api-key",
    "x-callback-url",
    "cookie",
];

fn extract_path(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

fn extract_request_id(request: &Request<Body>) -> String {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn redact_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .filter(|(name, _)| LOGGED_HEADERS.contains(&name.as_str()))
        .map(|(name, value)| {
            let shown = if REDACTED_HEADERS.contains(&name.as_str()) {
                "[REDACTED]"
            } else {
                value.to_str().unwrap_or("[invalid]")
            };
            format!("{}={}", name.as_str(), shown)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlisted_headers_are_dropped() {
        let request = Request::get("/cards")
            .header("etag", "\"abc\"")
            .header("user-agent", "octoprint/1.9")
            .body(Body::empty())
            .unwrap();

        let logged = redact_headers(request.headers());

        assert_eq!(logged, "user-agent=octoprint/1.9");
    }

    #[test]
    fn test_redact_headers_hides_keys_and_cookies() {
        let request = Request::post("/cards/replace")
            .header("x-api-key", "super-secret")
            .header("cookie", "session_id=abcdefgh12345678")
            .header("content-type", "multipart/form-data; boundary=x")
            .body(Body::empty())
            .unwrap();

        let logged = redact_headers(request.headers());

        assert!(logged.contains("x-api-key=[REDACTED]"));
        assert!(logged.contains("cookie=[REDACTED]"));
        assert!(logged.contains("content-type=multipart/form-data"));
        assert!(!logged.contains("super-secret"));
        assert!(!logged.contains("abcdefgh12345678"));
    }

    #[test]
    fn test_request_id_falls_back_to_fresh_uuid() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let id = extract_request_id(&request);
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        let request = Request::get("/health")
            .header("x-request-id", "req-1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_request_id(&request), "req-1");
    }
}
