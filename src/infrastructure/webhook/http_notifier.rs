//! HTTP callback delivery

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::domain::card::Card;
use crate::domain::webhook::CallbackNotifier;
use crate::domain::DomainError;

/// Default callback timeout in seconds
pub const DEFAULT_CALLBACK_TIMEOUT_SECS: u64 = 5;

/// Posts card results as JSON with a per-request timeout
#[derive(Debug, Clone)]
pub struct HttpCallbackNotifier {
    http_client: Client,
    timeout: Duration,
}

impl HttpCallbackNotifier {
    pub fn new(timeout: Duration) -> Result<Self, DomainError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            timeout,
        })
    }
}

#[async_trait]
impl CallbackNotifier for HttpCallbackNotifier {
    async fn notify(&self, url: &str, card: &Card) -> Result<(), DomainError> {
        let response = self
            .http_client
            .post(url)
            .timeout(self.timeout)
            .json(card)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    "Request timed out".to_string()
                } else if e.is_connect() {
                    "Connection failed".to_string()
                } else {
                    e.to_string()
                };
                DomainError::internal(format!("Callback to {} failed: {}", url, reason))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::internal(format!(
                "Callback to {} returned {}",
                url,
                status.as_u16()
            )));
        }

        debug!(url = %url, card_id = %card.card_id, "Callback delivered");
        Ok(())
    }
}

/// Fire a callback in the background; failures are logged and dropped
pub fn spawn_callback(notifier: Arc<dyn CallbackNotifier>, url: String, card: Card) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&url, &card).await {
            warn!(card_id = %card.card_id, "{}", e);
        }
    });
}
