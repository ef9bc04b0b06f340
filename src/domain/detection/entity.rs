//! Detection results

use serde::Serialize;
use thiserror::Error;

use crate::domain::card::{CardStatus, Scores};

/// One bounding box in source-image pixel coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
    pub label: String,
}

impl Detection {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn intersection_area(&self, other: &Detection) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 > x1 && y2 > y1 {
            (x2 - x1) * (y2 - y1)
        } else {
            0.0
        }
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// Everything a single detection run produces
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub status: CardStatus,
    pub scores: Scores,
    pub detections: Vec<Detection>,
    /// Source image with boxes drawn on it, JPEG encoded
    pub annotated_jpeg: Vec<u8>,
}

/// Errors raised by a detector
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Failed to encode result image: {0}")]
    Encode(String),
}
