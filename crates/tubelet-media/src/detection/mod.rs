//! Person detection for datasets that ship no bounding boxes.
//!
//! A detector sees a whole frame directory at once and returns at most one
//! box per frame, keyed by the frame's file stem.

mod command;
#[cfg(feature = "onnx")]
mod yolo;

use std::collections::BTreeMap;
use std::path::Path;

use tubelet_models::{BoundingBox, DetectorConfig, FrameNaming};

use crate::error::{MediaError, MediaResult};

pub use command::CommandDetector;
#[cfg(feature = "onnx")]
pub use yolo::{YoloPersonDetector, YoloConfig};

/// Frame file stem → person box.
pub type Detections = BTreeMap<String, BoundingBox>;

/// Bounding-box oracle over a directory of frames.
pub trait PersonDetector: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Detect the person in every frame of `dir`. Frames without a
    /// detection are absent from the result.
    fn detect_dir(&self, dir: &Path) -> MediaResult<Detections>;
}

/// Convert detector output keyed by file name or stem into frame indices.
///
/// Keys that do not match `naming` are ignored.
pub fn index_detections(detections: Detections, naming: &FrameNaming) -> BTreeMap<u64, BoundingBox> {
    detections
        .into_iter()
        .filter_map(|(name, bbox)| naming.parse_index(&name).map(|idx| (idx, bbox)))
        .collect()
}

/// Build the detector selected in the configuration.
pub fn detector_from_config(config: &DetectorConfig) -> MediaResult<Box<dyn PersonDetector>> {
    if let Some(program) = &config.command {
        return Ok(Box::new(CommandDetector::new(program, config.args.clone())));
    }

    #[cfg(feature = "onnx")]
    {
        if let Some(model) = &config.onnx_model {
            let yolo = YoloConfig {
                model_path: model.clone(),
                confidence_threshold: config.confidence_threshold,
                ..YoloConfig::default()
            };
            return Ok(Box::new(YoloPersonDetector::new(yolo)?));
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        if config.onnx_model.is_some() {
            return Err(MediaError::detection_failed(
                "onnx_model configured but the onnx feature is disabled",
            ));
        }
    }

    Err(MediaError::detection_failed("no detector command or model configured"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_detections() {
        let mut detections = Detections::new();
        detections.insert("img_00003".into(), BoundingBox::new(0.0, 0.0, 10.0, 10.0));
        detections.insert("img_00004.jpg".into(), BoundingBox::new(1.0, 1.0, 11.0, 11.0));
        detections.insert("thumbnail".into(), BoundingBox::new(1.0, 1.0, 11.0, 11.0));

        let indexed = index_detections(detections, &FrameNaming::default());
        assert_eq!(indexed.keys().copied().collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_detector_from_config_requires_a_source() {
        let config = DetectorConfig {
            command: None,
            args: vec![],
            onnx_model: None,
            confidence_threshold: 0.25,
        };
        assert!(detector_from_config(&config).is_err());

        let config = DetectorConfig {
            command: Some("detect-persons".into()),
            ..config
        };
        assert_eq!(detector_from_config(&config).unwrap().name(), "detect-persons");
    }
}
