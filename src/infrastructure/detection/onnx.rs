//! ONNX Runtime YOLO detector

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use image::DynamicImage;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info};

use crate::config::DetectionConfig;
use crate::domain::detection::{Detection, DetectionError, DetectionOutcome, DetectionRules, Detector};

use super::annotate::Annotator;
use super::postprocess::decode_output;
use super::preprocessing::{letterbox, to_nchw_tensor};
use super::render_outcome;

/// A YOLO export loaded into an ONNX Runtime session.
///
/// The session is not shareable across concurrent runs, so inference is
/// serialized behind a mutex.
pub struct OnnxYoloDetector {
    session: Mutex<Session>,
    input_name: String,
    model_name: String,
    input_size: u32,
    rules: DetectionRules,
    annotator: Annotator,
}

impl std::fmt::Debug for OnnxYoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxYoloDetector")
            .field("model_name", &self.model_name)
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl OnnxYoloDetector {
    /// Load the model described by `config`
    pub fn load(config: &DetectionConfig) -> Result<Self> {
        let model_path = config.model_path.as_path();
        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(config.intra_threads.max(1))
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let annotator = Annotator::from_optional_font(config.font_path.as_deref())?;

        debug!(input = %input_name, "Detection model loaded");

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            model_name: model_file_name(model_path),
            input_size: config.input_size,
            rules: config.rules.clone(),
            annotator,
        })
    }

    fn infer(&self, image: &DynamicImage) -> Result<Vec<Detection>, DetectionError> {
        let (canvas, geometry) = letterbox(image, self.input_size);
        let tensor = to_nchw_tensor(&canvas);

        let input = Value::from_array(tensor)
            .map_err(|e| DetectionError::Inference(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("Detection session is poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Inference(format!("Failed to extract output: {}", e)))?;

        decode_output(output, &self.rules, &geometry)
    }
}

fn model_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl Detector for OnnxYoloDetector {
    fn model_name(&self) -> String {
        self.model_name.clone()
    }

    fn detect(&self, image: &[u8]) -> Result<DetectionOutcome, DetectionError> {
        let decoded =
            image::load_from_memory(image).map_err(|e| DetectionError::Decode(e.to_string()))?;

        let detections = self.infer(&decoded)?;
        debug!(count = detections.len(), "Detections kept");

        render_outcome(&decoded, detections, &self.rules, &self.annotator)
    }
}
