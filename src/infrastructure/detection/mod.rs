//! Detection adapter
//!
//! Turns uploaded image bytes into a classified, annotated outcome.

mod annotate;
mod onnx;
mod postprocess;
mod preprocessing;

pub use annotate::{encode_jpeg, Annotator};
pub use onnx::OnnxYoloDetector;
pub use postprocess::{decode_output, non_max_suppression};
pub use preprocessing::{letterbox, to_nchw_tensor, Letterbox};

use image::DynamicImage;

use crate::domain::detection::{Detection, DetectionError, DetectionOutcome, DetectionRules};

/// Score, classify and draw kept detections onto the source image
pub fn render_outcome(
    source: &DynamicImage,
    detections: Vec<Detection>,
    rules: &DetectionRules,
    annotator: &Annotator,
) -> Result<DetectionOutcome, DetectionError> {
    let scores = rules.aggregate_scores(&detections);
    let status = rules.classify(&scores);

    let mut canvas = source.to_rgb8();
    annotator.draw(&mut canvas, &detections, rules);
    let annotated_jpeg = encode_jpeg(&canvas)?;

    Ok(DetectionOutcome {
        status,
        scores,
        detections,
        annotated_jpeg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::card::CardStatus;
    use image::{Rgb, RgbImage};

    fn spaghetti(confidence: f32) -> Detection {
        Detection {
            x1: 4.0,
            y1: 4.0,
            x2: 20.0,
            y2: 20.0,
            confidence,
            class_id: 2,
            label: "spaghetti".to_string(),
        }
    }

    fn source() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([90, 90, 90])))
    }

    #[test]
    fn test_render_fail_outcome() {
        let outcome = render_outcome(
            &source(),
            vec![spaghetti(0.6)],
            &DetectionRules::default(),
            &Annotator::without_captions(),
        )
        .unwrap();

        assert_eq!(outcome.status, CardStatus::Fail);
        assert_eq!(outcome.scores["spaghetti"], 0.6);
        assert_eq!(outcome.detections.len(), 1);
        assert!(image::load_from_memory(&outcome.annotated_jpeg).is_ok());
    }

    #[test]
    fn test_render_empty_outcome() {
        let outcome = render_outcome(
            &source(),
            Vec::new(),
            &DetectionRules::default(),
            &Annotator::without_captions(),
        )
        .unwrap();

        assert_eq!(outcome.status, CardStatus::NotPrintPart);
        assert!(outcome.scores.is_empty());
    }
}
