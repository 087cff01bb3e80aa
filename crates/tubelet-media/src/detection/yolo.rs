//! Person detection with a YOLOv8 ONNX model.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::DynamicImage;
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};
use tubelet_models::BoundingBox;

use super::{Detections, PersonDetector};
use crate::error::{MediaError, MediaResult};
use crate::frames::IMAGE_EXTENSIONS;

/// COCO class id of `person`.
const PERSON_CLASS: usize = 0;
const NUM_CLASSES: usize = 80;
const NUM_CANDIDATES: usize = 8400;

#[derive(Debug, Clone)]
pub struct YoloConfig {
    pub model_path: PathBuf,
    pub confidence_threshold: f32,
    /// Square model input size
    pub input_size: u32,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/yolov8n.onnx"),
            confidence_threshold: 0.25,
            input_size: 640,
        }
    }
}

/// Keeps the most confident person per frame.
pub struct YoloPersonDetector {
    session: Mutex<Session>,
    config: YoloConfig,
}

impl YoloPersonDetector {
    pub fn new(config: YoloConfig) -> MediaResult<Self> {
        if !config.model_path.exists() {
            return Err(MediaError::ModelNotFound(config.model_path.clone()));
        }
        let session = Mutex::new(create_session(&config.model_path)?);
        info!(model = %config.model_path.display(), size = config.input_size, "YOLO person model loaded");
        Ok(Self { session, config })
    }

    /// Most confident person box in absolute pixels.
    pub fn detect_image(&self, img: &DynamicImage) -> MediaResult<Option<(BoundingBox, f32)>> {
        let input = self.preprocess(img)?;
        let outputs = self.run_inference(input)?;
        self.best_person(&outputs, img.width(), img.height())
    }

    /// Resize to the model input, scale to [0, 1], lay out as NCHW.
    fn preprocess(&self, img: &DynamicImage) -> MediaResult<Value> {
        let size = self.config.input_size;
        let rgb = img
            .resize_exact(size, size, image::imageops::FilterType::Triangle)
            .to_rgb8();
        let (w, h) = (size as usize, size as usize);

        let planes = (0..3).flat_map(|c| rgb.pixels().map(move |p| p[c] as f32 / 255.0));
        let chw: Vec<f32> = planes.collect();

        Tensor::from_array((vec![1usize, 3, h, w], chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::internal(format!("input tensor: {}", e)))
    }

    fn run_inference(&self, input: Value) -> MediaResult<Vec<f32>> {
        let Ok(mut session) = self.session.lock() else {
            return Err(MediaError::internal("detector session poisoned"));
        };
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(format!("yolo forward pass: {}", e)))?;

        // [1, 84, 8400]
        let (_, scores) = outputs
            .get("output0")
            .ok_or_else(|| MediaError::detection_failed("model has no output0"))?
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::detection_failed(format!("output0: {}", e)))?;
        Ok(scores.to_vec())
    }

    fn best_person(&self, outputs: &[f32], width: u32, height: u32) -> MediaResult<Option<(BoundingBox, f32)>> {
        let features = 4 + NUM_CLASSES;
        let raw = Array::from_shape_vec((features, NUM_CANDIDATES), outputs.to_vec())
            .map_err(|e| MediaError::detection_failed(format!("output shape: {}", e)))?;
        let rows = raw.t();

        let scale_w = width as f64 / self.config.input_size as f64;
        let scale_h = height as f64 / self.config.input_size as f64;

        let mut best: Option<(BoundingBox, f32)> = None;
        for i in 0..NUM_CANDIDATES {
            let score = rows[[i, 4 + PERSON_CLASS]];
            if score < self.config.confidence_threshold {
                continue;
            }
            if best.as_ref().is_some_and(|(_, s)| *s >= score) {
                continue;
            }
            let (cx, cy) = (rows[[i, 0]] as f64, rows[[i, 1]] as f64);
            let (w, h) = (rows[[i, 2]] as f64, rows[[i, 3]] as f64);
            let bbox = BoundingBox::new(
                ((cx - w / 2.0) * scale_w).max(0.0),
                ((cy - h / 2.0) * scale_h).max(0.0),
                ((cx + w / 2.0) * scale_w).min(width as f64),
                ((cy + h / 2.0) * scale_h).min(height as f64),
            );
            best = Some((bbox, score));
        }
        Ok(best)
    }
}

impl PersonDetector for YoloPersonDetector {
    fn name(&self) -> &str {
        "yolov8"
    }

    fn detect_dir(&self, dir: &Path) -> MediaResult<Detections> {
        let mut frames: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            })
            .collect();
        frames.sort();

        let mut detections = Detections::new();
        for frame in &frames {
            let img = image::open(frame)?;
            if let Some((bbox, confidence)) = self.detect_image(&img)? {
                if let Some(stem) = frame.file_stem().and_then(|s| s.to_str()) {
                    detections.insert(stem.to_string(), bbox);
                }
                debug!(frame = %frame.display(), confidence, "Person detected");
            }
        }
        debug!(dir = %dir.display(), frames = frames.len(), hits = detections.len(), "Detection completed");
        Ok(detections)
    }
}

fn create_session(model_path: &Path) -> MediaResult<Session> {
    let onnx_err = |stage: &str, e: ort::Error| MediaError::internal(format!("onnx {}: {}", stage, e));
    let model = fs::read(model_path)?;
    Session::builder()
        .map_err(|e| onnx_err("builder", e))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| onnx_err("optimization", e))?
        .commit_from_memory(&model)
        .map_err(|e| onnx_err("model load", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model() {
        let config = YoloConfig {
            model_path: PathBuf::from("/nonexistent/yolov8n.onnx"),
            ..YoloConfig::default()
        };
        assert!(matches!(
            YoloPersonDetector::new(config),
            Err(MediaError::ModelNotFound(_))
        ));
    }
}
