//! Detection domain
//!
//! The model itself is an external collaborator; this module fixes its
//! contract and the rules that turn boxes into a verdict.

mod detector;
mod entity;
mod rules;

pub use detector::Detector;
#[cfg(test)]
pub use detector::MockDetector;
pub use entity::{Detection, DetectionError, DetectionOutcome};
pub use rules::DetectionRules;
