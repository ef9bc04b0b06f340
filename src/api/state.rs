//! Application state for shared services

use std::sync::Arc;

use crate::config::AppConfig;
use crate::domain::webhook::CallbackNotifier;
use crate::infrastructure::services::CardServiceTrait;
use crate::infrastructure::temp_store::TempStore;

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub card_service: Arc<dyn CardServiceTrait>,
    pub temp_store: TempStore,
    pub notifier: Arc<dyn CallbackNotifier>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        card_service: Arc<dyn CardServiceTrait>,
        temp_store: TempStore,
        notifier: Arc<dyn CallbackNotifier>,
        config: AppConfig,
    ) -> Self {
        Self {
            card_service,
            temp_store,
            notifier,
            config: Arc::new(config),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("temp_root", &self.temp_store.root())
            .finish_non_exhaustive()
    }
}
