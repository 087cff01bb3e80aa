//! Per-dataset run context.

use std::path::PathBuf;

use tubelet_models::{BboxPolicy, DatasetKind, DatasetSettings, FrameRate, GlobalSettings};

use crate::resolver::effective_policy;

/// Everything a worker needs to process one dataset.
///
/// Built once per dataset and shared read-only across the pool.
#[derive(Debug, Clone)]
pub struct DatasetContext {
    pub settings: DatasetSettings,
    pub policy: BboxPolicy,
    pub max_frames: usize,
    pub min_frames: usize,
    /// `{tmp_dir}/{DATASET}`, parent of every decoded frame directory
    pub frames_root: PathBuf,
    pub output_dir: PathBuf,
    pub rate: FrameRate,
    /// Detector boxes with a shorter side are discarded
    pub min_box_size: f64,
}

impl DatasetContext {
    pub fn new(settings: DatasetSettings, global: &GlobalSettings) -> Self {
        let policy = effective_policy(global.bbox_variation, settings.camera_is_static);
        let max_frames = settings.frames_for(global.max_duration);
        let min_frames = settings.frames_for(global.min_duration);
        let frames_root = global.tmp_dir.join(settings.kind.as_str());

        Self {
            policy,
            max_frames,
            min_frames,
            frames_root,
            output_dir: global.output_dir.clone(),
            rate: global.src_data_fps,
            min_box_size: global.min_box_size,
            settings,
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.settings.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubelet_models::{DataFormat, GeneratorConfig};

    #[test]
    fn test_derived_values() {
        let config = GeneratorConfig::from_json(
            r#"{"global_settings": {"output_dir": "out", "tmp_dir": "scratch",
                "max_duration": 2.0, "min_duration": 1.0, "bbox_variation": "union"}}"#,
        )
        .unwrap();

        let settings = DatasetSettings::new(DatasetKind::Okutama, "/data/okutama", DataFormat::Video, true, 29.97);
        let ctx = DatasetContext::new(settings, &config.global_settings);
        assert_eq!(ctx.max_frames, 59);
        assert_eq!(ctx.min_frames, 29);
        assert_eq!(ctx.frames_root, PathBuf::from("scratch/OKUTAMA"));
        // aerial footage never uses the union box
        assert_eq!(ctx.policy, BboxPolicy::Original);

        let settings = DatasetSettings::new(DatasetKind::Kth, "/data/kth", DataFormat::Video, false, 25.0);
        let ctx = DatasetContext::new(settings, &config.global_settings);
        assert_eq!(ctx.policy, BboxPolicy::Union);
        assert_eq!(ctx.kind(), DatasetKind::Kth);
    }
}
