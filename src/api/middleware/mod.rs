//! API middleware components

pub mod auth;
pub mod logging;
pub mod security;
pub mod session;

pub use auth::{RequireAnyCardKey, RequireCardKey, API_KEY_HEADER};
pub use logging::logging_middleware;
pub use security::security_headers_middleware;
pub use session::ensure_session;
