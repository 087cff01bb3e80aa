//! Shared data models for the tubelet dataset generator.
//!
//! This crate provides Serde-serializable types for:
//! - Canonical activity records and bounding boxes
//! - Dataset identity and frame file naming
//! - The configuration document
//! - Tubelet names and train/test splits

pub mod bbox;
pub mod config;
pub mod dataset;
pub mod error;
pub mod frame;
pub mod naming;
pub mod record;
pub mod split;

// Re-export common types
pub use bbox::{BoundingBox, PixelRect};
pub use config::{
    BboxPolicy, DataFormat, DatasetConfig, DatasetSelection, DatasetSettings, DetectorConfig,
    FrameRate, GeneratorConfig, GlobalSettings, ProcessingMode,
};
pub use dataset::DatasetKind;
pub use error::{ConfigError, ConfigResult};
pub use frame::FrameNaming;
pub use naming::{normalize_component, source_id_for, source_label, NameParseError, TubeletName};
pub use record::{ActivityRecord, VideoRecords};
pub use split::{Split, CLASS_LIST_FILE};
