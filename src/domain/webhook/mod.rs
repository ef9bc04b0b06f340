//! Webhook domain

mod notifier;

pub use notifier::CallbackNotifier;
#[cfg(test)]
pub use notifier::MockCallbackNotifier;
