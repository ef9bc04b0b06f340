//! Detector trait

use super::entity::{DetectionError, DetectionOutcome};

#[cfg(test)]
use mockall::automock;

/// A loaded detection model
///
/// Implementations are CPU bound and blocking; callers on the async
/// runtime must hop onto the blocking pool.
#[cfg_attr(test, automock)]
pub trait Detector: Send + Sync {
    /// Identifier reported on cards (e.g. the model file name)
    fn model_name(&self) -> String;

    /// Run the model on encoded image bytes
    fn detect(&self, image: &[u8]) -> Result<DetectionOutcome, DetectionError>;

    /// Whether the model is loaded and can serve requests
    fn is_ready(&self) -> bool {
        true
    }
}
