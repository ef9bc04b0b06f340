//! Business rules turning raw detections into a card status

use serde::{Deserialize, Serialize};

use super::entity::Detection;
use crate::domain::card::{CardStatus, Scores};

/// Thresholds and class membership used to judge a print
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionRules {
    /// Minimum confidence for a box to be kept and for a failure verdict
    pub conf_threshold: f32,
    /// IoU above which overlapping boxes of the same class are suppressed
    pub iou_threshold: f32,
    /// Class IDs the model output is filtered to
    pub classes: Vec<usize>,
    /// Label for each class ID, indexed by ID
    pub labels: Vec<String>,
    /// Label whose presence marks the print as failed
    pub fail_label: String,
}

impl Default for DetectionRules {
    fn default() -> Self {
        Self {
            conf_threshold: 0.2,
            iou_threshold: 0.7,
            classes: vec![0, 2],
            labels: vec![
                "normal print".to_string(),
                "print header".to_string(),
                "spaghetti".to_string(),
            ],
            fail_label: "spaghetti".to_string(),
        }
    }
}

impl DetectionRules {
    pub fn allows_class(&self, class_id: usize) -> bool {
        self.classes.is_empty() || self.classes.contains(&class_id)
    }

    /// Label for a class ID, falling back to `class_<id>`
    pub fn label_for(&self, class_id: usize) -> String {
        self.labels
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }

    pub fn is_fail_label(&self, label: &str) -> bool {
        label == self.fail_label
    }

    /// Highest confidence seen for every label
    pub fn aggregate_scores(&self, detections: &[Detection]) -> Scores {
        let mut scores = Scores::new();

        for detection in detections {
            let entry = scores.entry(detection.label.clone()).or_insert(0.0);
            *entry = entry.max(detection.confidence);
        }

        scores
    }

    /// Status derived from aggregated scores
    ///
    /// `FAIL` when the fail label reaches the threshold, `NORMAL` when any
    /// print was seen, `NOT_3DPRINT_PART` when nothing was detected.
    pub fn classify(&self, scores: &Scores) -> CardStatus {
        let fail_score = scores.get(&self.fail_label).copied().unwrap_or(0.0);

        if fail_score >= self.conf_threshold {
            CardStatus::Fail
        } else if scores.is_empty() {
            CardStatus::NotPrintPart
        } else {
            CardStatus::Normal
        }
    }
}
