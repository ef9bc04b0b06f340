//! Decoding of YOLO output tensors
//!
//! Expects the anchor-free export layout `[1, 4 + classes, anchors]` where
//! each anchor column holds `cx, cy, w, h` followed by per-class scores.
//! The transposed layout `[1, anchors, 4 + classes]` is accepted as well.

use std::cmp::Ordering;

use ndarray::{ArrayViewD, Axis, Ix2};

use crate::domain::detection::{Detection, DetectionError, DetectionRules};

use super::preprocessing::Letterbox;

/// Decode raw model output into filtered, suppressed detections in source
/// image coordinates.
pub fn decode_output(
    output: ArrayViewD<'_, f32>,
    rules: &DetectionRules,
    letterbox: &Letterbox,
) -> Result<Vec<Detection>, DetectionError> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        return Err(DetectionError::Inference(format!(
            "Unexpected output shape: {:?}",
            shape
        )));
    }

    let matrix = output
        .index_axis(Axis(0), 0)
        .into_dimensionality::<Ix2>()
        .map_err(|e| DetectionError::Inference(e.to_string()))?;

    let expected = 4 + rules.labels.len();
    let matrix = match (shape[1] == expected, shape[2] == expected) {
        (true, _) => matrix,
        (false, true) => matrix.reversed_axes(),
        // Unknown class count: rows are attributes when there are fewer of them
        (false, false) if shape[1] <= shape[2] => matrix,
        (false, false) => matrix.reversed_axes(),
    };

    if matrix.nrows() <= 4 {
        return Err(DetectionError::Inference(format!(
            "Output has no class scores: {:?}",
            shape
        )));
    }

    let mut detections = Vec::new();

    for anchor in matrix.axis_iter(Axis(1)) {
        let (class_id, confidence) = anchor
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .fold((0usize, f32::MIN), |best, (id, score)| {
                if score > best.1 { (id, score) } else { best }
            });

        if confidence < rules.conf_threshold || !rules.allows_class(class_id) {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        let (x1, y1) = letterbox.to_source(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_source(cx + w / 2.0, cy + h / 2.0);

        detections.push(Detection {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
            label: rules.label_for(class_id),
        });
    }

    Ok(non_max_suppression(detections, rules.iou_threshold))
}

/// Per-class non-maximum suppression, highest confidence first
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::new();

    for candidate in detections {
        let suppressed = kept.iter().any(|existing| {
            existing.class_id == candidate.class_id && existing.iou(&candidate) >= iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn identity() -> Letterbox {
        Letterbox::new(640, 640, 640)
    }

    /// Build a `[1, 4 + 3, n]` tensor from (cx, cy, w, h, [scores; 3]) rows
    fn output(anchors: &[(f32, f32, f32, f32, [f32; 3])]) -> Array3<f32> {
        let mut arr = Array3::zeros((1, 7, anchors.len()));
        for (i, (cx, cy, w, h, scores)) in anchors.iter().enumerate() {
            arr[[0, 0, i]] = *cx;
            arr[[0, 1, i]] = *cy;
            arr[[0, 2, i]] = *w;
            arr[[0, 3, i]] = *h;
            for (c, s) in scores.iter().enumerate() {
                arr[[0, 4 + c, i]] = *s;
            }
        }
        arr
    }

    #[test]
    fn test_decode_filters_threshold_and_classes() {
        let rules = DetectionRules::default();
        let arr = output(&[
            (100.0, 100.0, 50.0, 50.0, [0.9, 0.0, 0.0]),  // normal print
            (300.0, 300.0, 50.0, 50.0, [0.0, 0.95, 0.0]), // print header, not allowed
            (500.0, 500.0, 50.0, 50.0, [0.0, 0.0, 0.1]),  // below threshold
            (200.0, 400.0, 40.0, 20.0, [0.0, 0.0, 0.6]),  // spaghetti
        ]);

        let detections = decode_output(arr.view().into_dyn(), &rules, &identity()).unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].label, "normal print");
        assert_eq!(detections[0].x1, 75.0);
        assert_eq!(detections[0].y2, 125.0);
        assert_eq!(detections[1].label, "spaghetti");
        assert_eq!(detections[1].class_id, 2);
    }

    #[test]
    fn test_decode_accepts_transposed_layout() {
        let rules = DetectionRules::default();
        let mut anchors = vec![(0.0, 0.0, 0.0, 0.0, [0.0; 3]); 8];
        anchors[3] = (100.0, 100.0, 50.0, 50.0, [0.0, 0.0, 0.8]);
        let mut arr = output(&anchors);
        arr.swap_axes(1, 2);
        let transposed = arr.as_standard_layout().to_owned();

        let detections =
            decode_output(transposed.view().into_dyn(), &rules, &identity()).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "spaghetti");
    }

    #[test]
    fn test_decode_maps_to_source_coordinates() {
        let rules = DetectionRules::default();
        let geometry = Letterbox::new(1280, 640, 640);
        let arr = output(&[(320.0, 320.0, 100.0, 100.0, [0.9, 0.0, 0.0])]);

        let detections = decode_output(arr.view().into_dyn(), &rules, &geometry).unwrap();

        let d = &detections[0];
        assert!((d.x1 - 540.0).abs() < 1e-3);
        assert!((d.y1 - 220.0).abs() < 1e-3);
        assert!((d.x2 - 740.0).abs() < 1e-3);
        assert!((d.y2 - 420.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_single_anchor_keeps_attribute_rows() {
        let rules = DetectionRules::default();
        let arr = output(&[(64.0, 64.0, 32.0, 32.0, [0.0, 0.0, 0.75])]);

        let detections = decode_output(arr.view().into_dyn(), &rules, &identity()).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 2);
        assert_eq!(detections[0].x1, 48.0);
    }

    #[test]
    fn test_decode_unknown_class_count_falls_back_to_shape() {
        let rules = DetectionRules {
            labels: Vec::new(),
            classes: Vec::new(),
            ..DetectionRules::default()
        };
        let mut anchors = vec![(0.0, 0.0, 0.0, 0.0, [0.0; 3]); 10];
        anchors[0] = (100.0, 100.0, 20.0, 20.0, [0.0, 0.9, 0.0]);
        let arr = output(&anchors);

        let detections = decode_output(arr.view().into_dyn(), &rules, &identity()).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].label, "class_1");
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        let rules = DetectionRules::default();
        let arr = ndarray::Array2::<f32>::zeros((7, 10));

        let result = decode_output(arr.view().into_dyn(), &rules, &identity());
        assert!(matches!(result, Err(DetectionError::Inference(_))));
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let rules = DetectionRules::default();
        let arr = output(&[
            (100.0, 100.0, 50.0, 50.0, [0.7, 0.0, 0.0]),
            (102.0, 102.0, 50.0, 50.0, [0.9, 0.0, 0.0]),
            (102.0, 102.0, 50.0, 50.0, [0.0, 0.0, 0.5]),
        ]);

        let detections = decode_output(arr.view().into_dyn(), &rules, &identity()).unwrap();

        // The weaker overlapping normal box goes; the spaghetti box survives
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].confidence, 0.9);
        assert_eq!(detections[1].label, "spaghetti");
    }

    #[test]
    fn test_nms_keeps_disjoint_boxes() {
        let boxes = vec![
            Detection {
                x1: 0.0,
                y1: 0.0,
                x2: 10.0,
                y2: 10.0,
                confidence: 0.5,
                class_id: 0,
                label: "normal print".to_string(),
            },
            Detection {
                x1: 50.0,
                y1: 50.0,
                x2: 60.0,
                y2: 60.0,
                confidence: 0.6,
                class_id: 0,
                label: "normal print".to_string(),
            },
        ];

        let kept = non_max_suppression(boxes, 0.7);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.6);
    }
}
