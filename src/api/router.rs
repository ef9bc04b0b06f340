use axum::{extract::DefaultBodyLimit, http::HeaderValue, middleware, routing::get, Router};
use tower_http::cors::{AllowHeaders, AllowMethods, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::cards;
use super::files;
use super::health;
use super::middleware::{logging_middleware, security_headers_middleware};
use super::state::AppState;
use crate::config::CorsConfig;
use crate::infrastructure::services::RESULTS_URL_PREFIX;

/// Room for multipart framing on top of the file itself, so oversized files
/// are caught by the upload extractor with a precise message.
const BODY_LIMIT_HEADROOM: usize = 1024 * 1024;

/// Create the full router with application state
pub fn create_router_with_state(state: AppState) -> Router {
    let body_limit = state
        .config
        .uploads
        .max_bytes
        .saturating_add(BODY_LIMIT_HEADROOM);
    let cors = cors_layer(&state.config.cors);
    let frontend = state.config.frontend.clone();

    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        // Card API
        .merge(cards::create_cards_router())
        // Rendered results
        .route(
            &format!("{}/{{sid}}/{{filename}}", RESULTS_URL_PREFIX),
            get(files::serve_result),
        )
        // Bundled page
        .nest_service("/static", ServeDir::new(&frontend.static_dir))
        .route_service("/", ServeFile::new(&frontend.index_file))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors)
}

/// `*` opens the API to any origin without credentials; an explicit list
/// allows credentialed requests from those origins only.
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
