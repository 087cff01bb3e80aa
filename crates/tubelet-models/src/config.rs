//! The generator configuration document.
//!
//! The document has two sections: `global_settings`, shared by every
//! dataset, and `each_dataset_config`, one entry per source dataset. Keys
//! whose presence depends on the dataset are kept optional here and checked
//! by [`DatasetConfig::resolve`] and the dataset adapters before any work
//! starts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::DatasetKind;
use crate::error::{ConfigError, ConfigResult};
use crate::frame::FrameNaming;

/// Default temporary directory for decoded frames.
pub const DEFAULT_TMP_DIR: &str = "tmp";
/// Default directory for per-dataset record snapshots.
pub const DEFAULT_SNAPSHOT_DIR: &str = "snapshots";
/// Default seed for the stratified split.
pub const DEFAULT_SPLIT_SEED: u64 = 42;
/// Default share of each class assigned to the test split.
pub const DEFAULT_TEST_FRACTION: f64 = 0.25;
/// Frames between two observations below which they belong to one interval.
pub const DEFAULT_MERGE_GAP: u64 = 3;
/// Boxes narrower or shorter than this (pixels) are treated as noise.
pub const DEFAULT_MIN_BOX_SIZE: f64 = 10.0;
/// Classes with fewer train or test samples are dropped by the stats phase.
pub const DEFAULT_MIN_SAMPLES_PER_CLASS: usize = 10;

/// Complete configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub global_settings: GlobalSettings,
    #[serde(default)]
    pub each_dataset_config: BTreeMap<String, DatasetConfig>,
}

/// Settings shared by every dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Root directory of the materialized tubelets and manifests
    pub output_dir: PathBuf,

    /// Scratch directory for decoded frames
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,

    /// Where normalized records are dumped per dataset
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,

    /// Longest tubelet, in seconds
    pub max_duration: f64,

    /// Shortest tubelet kept in the manifests, in seconds
    pub min_duration: f64,

    /// Per-frame crop policy
    pub bbox_variation: BboxPolicy,

    #[serde(default)]
    pub datasets_to_consider: DatasetSelection,

    #[serde(default)]
    pub processing_mode: ProcessingMode,

    /// Worker pool size; defaults to the number of CPUs
    #[serde(default)]
    pub workers: Option<usize>,

    /// Rate at which videos are decoded
    #[serde(default)]
    pub src_data_fps: FrameRate,

    #[serde(default = "default_split_seed")]
    pub split_seed: u64,

    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    #[serde(default = "default_merge_gap")]
    pub merge_gap: u64,

    #[serde(default = "default_min_box_size")]
    pub min_box_size: f64,

    /// Person detector used for datasets without boxes
    #[serde(default)]
    pub detector: Option<DetectorConfig>,

    /// Native label → unified label overrides for the relabel phase
    #[serde(default)]
    pub label_map: Option<BTreeMap<String, String>>,

    /// Ordered unified label list for the relabel phase
    #[serde(default)]
    pub tubelet_labels: Option<Vec<String>>,

    #[serde(default = "default_min_samples_per_class")]
    pub min_samples_per_class: usize,
}

fn default_tmp_dir() -> PathBuf {
    PathBuf::from(DEFAULT_TMP_DIR)
}
fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SNAPSHOT_DIR)
}
fn default_split_seed() -> u64 {
    DEFAULT_SPLIT_SEED
}
fn default_test_fraction() -> f64 {
    DEFAULT_TEST_FRACTION
}
fn default_merge_gap() -> u64 {
    DEFAULT_MERGE_GAP
}
fn default_min_box_size() -> f64 {
    DEFAULT_MIN_BOX_SIZE
}
fn default_min_samples_per_class() -> usize {
    DEFAULT_MIN_SAMPLES_PER_CLASS
}

/// Crop region policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BboxPolicy {
    /// The box annotated (or detected) for the frame itself.
    Original,
    /// Union of every box in the tubelet window.
    Union,
}

impl TryFrom<String> for BboxPolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_ascii_lowercase().as_str() {
            "original" | "org" => Ok(BboxPolicy::Original),
            "union" => Ok(BboxPolicy::Union),
            other => Err(format!(
                "unknown bbox_variation '{}', expected 'original' or 'union'",
                other
            )),
        }
    }
}

impl From<BboxPolicy> for String {
    fn from(policy: BboxPolicy) -> Self {
        policy.to_string()
    }
}

impl fmt::Display for BboxPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BboxPolicy::Original => f.write_str("original"),
            BboxPolicy::Union => f.write_str("union"),
        }
    }
}

/// Which datasets a run processes: `"ALL"` or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetSelection {
    Named(Vec<String>),
    Keyword(String),
}

impl Default for DatasetSelection {
    fn default() -> Self {
        DatasetSelection::Keyword("ALL".to_string())
    }
}

/// How work units are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    Sequential,
    #[default]
    Parallel,
}

/// Decode rate: the video's native rate or a fixed number of frames per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum FrameRate {
    #[default]
    Native,
    Fps(f64),
}

impl TryFrom<serde_json::Value> for FrameRate {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match &value {
            serde_json::Value::String(s) if s == "org" || s == "native" => Ok(FrameRate::Native),
            serde_json::Value::String(s) => s
                .parse::<f64>()
                .ok()
                .filter(|fps| *fps > 0.0)
                .map(FrameRate::Fps)
                .ok_or_else(|| format!("invalid src_data_fps '{}'", s)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .filter(|fps| *fps > 0.0)
                .map(FrameRate::Fps)
                .ok_or_else(|| format!("invalid src_data_fps {}", n)),
            other => Err(format!("invalid src_data_fps {}", other)),
        }
    }
}

impl From<FrameRate> for serde_json::Value {
    fn from(rate: FrameRate) -> Self {
        match rate {
            FrameRate::Native => serde_json::Value::String("org".to_string()),
            FrameRate::Fps(fps) => serde_json::json!(fps),
        }
    }
}

/// Person detector selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// External program printing `{frame: [x1, y1, x2, y2]}` JSON
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    /// YOLOv8 ONNX model (requires the `onnx` feature)
    #[serde(default)]
    pub onnx_model: Option<PathBuf>,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

fn default_confidence_threshold() -> f32 {
    0.25
}

/// How source frames are provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    /// Video files that must be decoded first
    Video,
    /// Directories of already extracted frames
    Frames,
}

/// Raw per-dataset entry of the configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub src_dir: Option<PathBuf>,
    #[serde(default)]
    pub data_format: Option<DataFormat>,
    /// Whether the dataset ships bounding boxes
    #[serde(default)]
    pub bbox_info: Option<bool>,
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default, alias = "classes_to_include")]
    pub activity_allow_list: Option<Vec<String>>,
    #[serde(default)]
    pub sequence_file: Option<PathBuf>,
    #[serde(default)]
    pub processed_annotations_dir: Option<PathBuf>,
    #[serde(default)]
    pub labels_dir: Option<PathBuf>,
    #[serde(default)]
    pub first_frame_index: Option<u64>,
    #[serde(default)]
    pub frame_naming: Option<FrameNaming>,
    #[serde(default)]
    pub camera_is_static: Option<bool>,
}

impl DatasetConfig {
    /// Check the keys every dataset needs and fill in per-dataset defaults.
    pub fn resolve(&self, kind: DatasetKind) -> ConfigResult<DatasetSettings> {
        let name = kind.as_str();
        let src_dir = self
            .src_dir
            .clone()
            .ok_or_else(|| ConfigError::missing_key(name, "src_dir"))?;
        let data_format = self
            .data_format
            .ok_or_else(|| ConfigError::missing_key(name, "data_format"))?;
        let bbox_info = self
            .bbox_info
            .ok_or_else(|| ConfigError::missing_key(name, "bbox_info"))?;
        let fps = self
            .fps
            .ok_or_else(|| ConfigError::missing_key(name, "fps"))?;
        if !(fps > 0.0) {
            return Err(ConfigError::invalid_value(
                format!("{}.fps", name),
                format!("must be positive, got {}", fps),
            ));
        }

        Ok(DatasetSettings {
            kind,
            src_dir,
            data_format,
            bbox_info,
            fps,
            allow_list: self
                .activity_allow_list
                .as_ref()
                .map(|list| list.iter().cloned().collect()),
            sequence_file: self.sequence_file.clone(),
            processed_annotations_dir: self.processed_annotations_dir.clone(),
            labels_dir: self.labels_dir.clone(),
            first_frame_index: self
                .first_frame_index
                .unwrap_or_else(|| kind.default_first_frame_index()),
            frame_naming: self
                .frame_naming
                .clone()
                .unwrap_or_else(|| kind.default_frame_naming()),
            camera_is_static: self
                .camera_is_static
                .unwrap_or_else(|| kind.default_camera_is_static()),
        })
    }
}

/// Validated settings of one dataset, immutable for a run.
#[derive(Debug, Clone)]
pub struct DatasetSettings {
    pub kind: DatasetKind,
    pub src_dir: PathBuf,
    pub data_format: DataFormat,
    pub bbox_info: bool,
    pub fps: f64,
    pub allow_list: Option<BTreeSet<String>>,
    pub sequence_file: Option<PathBuf>,
    pub processed_annotations_dir: Option<PathBuf>,
    pub labels_dir: Option<PathBuf>,
    pub first_frame_index: u64,
    pub frame_naming: FrameNaming,
    pub camera_is_static: bool,
}

impl DatasetSettings {
    /// Minimal settings for a dataset, mostly useful in tests.
    pub fn new(kind: DatasetKind, src_dir: impl Into<PathBuf>, data_format: DataFormat, bbox_info: bool, fps: f64) -> Self {
        Self {
            kind,
            src_dir: src_dir.into(),
            data_format,
            bbox_info,
            fps,
            allow_list: None,
            sequence_file: None,
            processed_annotations_dir: None,
            labels_dir: None,
            first_frame_index: kind.default_first_frame_index(),
            frame_naming: kind.default_frame_naming(),
            camera_is_static: kind.default_camera_is_static(),
        }
    }

    /// Return a format-specific path key or a missing key error.
    pub fn require<'a>(&self, key: &'static str, value: &'a Option<PathBuf>) -> ConfigResult<&'a Path> {
        value
            .as_deref()
            .ok_or_else(|| ConfigError::missing_key(self.kind.as_str(), key))
    }

    /// Whether the activity passes the optional allow-list.
    pub fn allows(&self, activity: &str) -> bool {
        self.allow_list
            .as_ref()
            .map_or(true, |list| list.contains(activity))
    }

    /// Number of frames covering `seconds` at this dataset's rate (floored).
    pub fn frames_for(&self, seconds: f64) -> usize {
        (seconds * self.fps).floor().max(0.0) as usize
    }
}

impl GeneratorConfig {
    /// Parse a configuration document.
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Validate the document and resolve the datasets selected for this run.
    ///
    /// Fails on the first problem so nothing is processed with a broken
    /// configuration.
    pub fn validate(&self) -> ConfigResult<Vec<DatasetSettings>> {
        let g = &self.global_settings;
        if !(g.max_duration > 0.0) {
            return Err(ConfigError::invalid_value("max_duration", "must be positive"));
        }
        if !(g.min_duration >= 0.0) {
            return Err(ConfigError::invalid_value("min_duration", "must not be negative"));
        }
        if !(0.0..=1.0).contains(&g.test_fraction) {
            return Err(ConfigError::invalid_value("test_fraction", "must be within [0, 1]"));
        }
        if g.workers == Some(0) {
            return Err(ConfigError::invalid_value("workers", "must be at least 1"));
        }

        let mut selected = Vec::new();
        for kind in self.selected_kinds()? {
            let entry = self
                .dataset_entry(kind)
                .ok_or_else(|| ConfigError::MissingDataset(kind.to_string()))?;
            let settings = entry.resolve(kind)?;

            if settings.frames_for(g.max_duration) == 0 {
                return Err(ConfigError::invalid_value(
                    "max_duration",
                    format!("yields no frames at {} fps for {}", settings.fps, kind),
                ));
            }
            if !settings.bbox_info && g.detector.is_none() {
                return Err(ConfigError::MissingDetector(kind.to_string()));
            }
            selected.push(settings);
        }
        Ok(selected)
    }

    /// Datasets to process, in configuration order for explicit lists and
    /// canonical order otherwise.
    pub fn selected_kinds(&self) -> ConfigResult<Vec<DatasetKind>> {
        match &self.global_settings.datasets_to_consider {
            DatasetSelection::Keyword(k) if k.eq_ignore_ascii_case("all") => {
                let mut kinds = self.configured_kinds()?;
                kinds.sort();
                Ok(kinds)
            }
            DatasetSelection::Keyword(other) => Err(ConfigError::invalid_value(
                "datasets_to_consider",
                format!("expected \"ALL\" or a list, got '{}'", other),
            )),
            DatasetSelection::Named(names) => {
                let mut kinds = Vec::with_capacity(names.len());
                for name in names {
                    let kind = name
                        .parse::<DatasetKind>()
                        .map_err(|_| ConfigError::UnknownDataset(name.clone()))?;
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
                Ok(kinds)
            }
        }
    }

    /// Every dataset with an entry in `each_dataset_config`.
    pub fn configured_kinds(&self) -> ConfigResult<Vec<DatasetKind>> {
        self.each_dataset_config
            .keys()
            .map(|name| {
                name.parse::<DatasetKind>()
                    .map_err(|_| ConfigError::UnknownDataset(name.clone()))
            })
            .collect()
    }

    /// Entry of one dataset, matching keys case- and punctuation-insensitively.
    pub fn dataset_entry(&self, kind: DatasetKind) -> Option<&DatasetConfig> {
        self.each_dataset_config
            .iter()
            .find(|(name, _)| name.parse::<DatasetKind>().ok() == Some(kind))
            .map(|(_, cfg)| cfg)
    }

    /// Resolve every configured dataset, selected or not.
    ///
    /// The split phase needs the frame rate of every dataset that may have
    /// tubelets on disk.
    pub fn all_dataset_settings(&self) -> ConfigResult<BTreeMap<DatasetKind, DatasetSettings>> {
        let mut all = BTreeMap::new();
        for kind in self.configured_kinds()? {
            if let Some(entry) = self.dataset_entry(kind) {
                all.insert(kind, entry.resolve(kind)?);
            }
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> String {
        r#"{
            "global_settings": {
                "output_dir": "out",
                "max_duration": 2.0,
                "min_duration": 1.0,
                "bbox_variation": "union",
                "datasets_to_consider": ["KTH", "OKUTAMA"],
                "detector": {"command": "detect"}
            },
            "each_dataset_config": {
                "KTH": {
                    "src_dir": "/data/kth",
                    "data_format": "video",
                    "bbox_info": false,
                    "fps": 25,
                    "sequence_file": "/data/kth/00sequences.txt"
                },
                "OKUTAMA": {
                    "src_dir": "/data/okutama",
                    "data_format": "video",
                    "bbox_info": true,
                    "fps": 30,
                    "labels_dir": "/data/okutama/labels",
                    "classes_to_include": ["Walking", "Running"]
                }
            }
        }"#
        .to_string()
    }

    #[test]
    fn test_parse_and_validate() {
        let config = GeneratorConfig::from_json(&sample_document()).unwrap();
        assert_eq!(config.global_settings.bbox_variation, BboxPolicy::Union);
        assert_eq!(config.global_settings.tmp_dir, PathBuf::from("tmp"));
        assert_eq!(config.global_settings.split_seed, DEFAULT_SPLIT_SEED);
        assert_eq!(config.global_settings.src_data_fps, FrameRate::Native);

        let selected = config.validate().unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].kind, DatasetKind::Kth);
        assert_eq!(selected[0].first_frame_index, 1);
        assert_eq!(selected[0].frames_for(2.0), 50);
        assert!(selected[1].allows("Walking"));
        assert!(!selected[1].allows("Sitting"));
        assert!(!selected[1].camera_is_static);
    }

    #[test]
    fn test_policy_aliases_and_rejection() {
        let doc = sample_document().replace("\"union\"", "\"org\"");
        let config = GeneratorConfig::from_json(&doc).unwrap();
        assert_eq!(config.global_settings.bbox_variation, BboxPolicy::Original);

        let doc = sample_document().replace("\"union\"", "\"uniform\"");
        let err = GeneratorConfig::from_json(&doc).unwrap_err();
        assert!(err.to_string().contains("unknown bbox_variation"));
    }

    #[test]
    fn test_missing_common_key() {
        let doc = sample_document().replace("\"fps\": 25,", "");
        let config = GeneratorConfig::from_json(&doc).unwrap();
        match config.validate() {
            Err(ConfigError::MissingKey { dataset, key }) => {
                assert_eq!(dataset, "KTH");
                assert_eq!(key, "fps");
            }
            other => panic!("expected missing key, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_detector() {
        let doc = sample_document().replace("\"detector\": {\"command\": \"detect\"}", "\"tmp_dir\": \"t\"");
        let config = GeneratorConfig::from_json(&doc).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::MissingDetector(d)) if d == "KTH"));
    }

    #[test]
    fn test_unknown_selected_dataset() {
        let doc = sample_document().replace("[\"KTH\", \"OKUTAMA\"]", "[\"KINETICS\"]");
        let config = GeneratorConfig::from_json(&doc).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::UnknownDataset(_))));
    }

    #[test]
    fn test_selected_dataset_without_entry() {
        let doc = sample_document().replace("[\"KTH\", \"OKUTAMA\"]", "[\"MCAD\"]");
        let config = GeneratorConfig::from_json(&doc).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::MissingDataset(_))));
    }

    #[test]
    fn test_all_keyword_selects_configured_datasets() {
        let doc = sample_document().replace("[\"KTH\", \"OKUTAMA\"]", "\"ALL\"");
        let config = GeneratorConfig::from_json(&doc).unwrap();
        assert_eq!(
            config.selected_kinds().unwrap(),
            vec![DatasetKind::Kth, DatasetKind::Okutama]
        );
    }

    #[test]
    fn test_frame_rate_values() {
        assert_eq!(FrameRate::try_from(serde_json::json!("org")).unwrap(), FrameRate::Native);
        assert_eq!(FrameRate::try_from(serde_json::json!(10)).unwrap(), FrameRate::Fps(10.0));
        assert_eq!(FrameRate::try_from(serde_json::json!("12.5")).unwrap(), FrameRate::Fps(12.5));
        assert!(FrameRate::try_from(serde_json::json!(0)).is_err());
        assert!(FrameRate::try_from(serde_json::json!(true)).is_err());
    }
}
