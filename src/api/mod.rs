//! API layer - HTTP endpoints and middleware

pub mod cards;
pub mod files;
pub mod health;
pub mod middleware;
pub mod router;
pub mod state;
pub mod types;

#[cfg(test)]
mod test_support;

pub use router::create_router_with_state;
pub use state::AppState;
