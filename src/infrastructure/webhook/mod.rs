//! Webhook infrastructure - result callbacks

mod http_notifier;

pub use http_notifier::{spawn_callback, HttpCallbackNotifier, DEFAULT_CALLBACK_TIMEOUT_SECS};
