//! Serve command - runs the HTTP server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, info, warn};

use crate::api::create_router_with_state;
use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::services::CardServiceTrait;

/// How often expired API keys are removed from storage
const KEY_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Run the server until Ctrl+C or SIGTERM
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_logging(&config.logging);

    let state = crate::create_app_state_with_config(&config).await?;
    let purge_task = tokio::spawn(purge_expired_keys(Arc::clone(&state.card_service)));
    let app = create_router_with_state(state);

    let addr = build_socket_addr(&config)?;
    info!("Starting Print Guard on {}", addr);

    let listener = TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge_task.abort();
    info!("Server shutdown complete");

    Ok(())
}

async fn purge_expired_keys(card_service: Arc<dyn CardServiceTrait>) {
    let mut interval = tokio::time::interval(KEY_PURGE_INTERVAL);
    loop {
        interval.tick().await;
        match card_service.purge_expired_keys().await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "Purged expired API keys"),
            Err(e) => warn!(error = %e, "Failed to purge expired API keys"),
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

fn build_socket_addr(config: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    )))
}
