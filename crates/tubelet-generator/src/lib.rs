//! Tubelet dataset generation.
//!
//! This crate provides:
//! - Configuration loading with environment overrides
//! - Frame acquisition and person detection per video
//! - Tubelet segmentation, box resolution and cropping on a worker pool
//! - The global train/test split and the relabel and stats phases

pub mod acquisition;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod metrics;
pub mod pipeline;
pub mod relabel;
pub mod resolver;
pub mod splitter;
pub mod stats;
pub mod tubelet;

pub use acquisition::{acquire_video, AcquiredVideo};
pub use config::load_config;
pub use context::DatasetContext;
pub use error::{GeneratorError, GeneratorResult};
pub use logging::{init_tracing, DatasetLogger};
pub use manifest::ManifestEntry;
pub use pipeline::{split_output, DatasetSummary, Pipeline};
pub use relabel::{relabel_manifests, LabelMapper};
pub use resolver::{effective_policy, resolve, WindowResolver};
pub use splitter::{split_tubelets, SplitPlan, SplitReport};
pub use stats::{filter_classes, ClassFilter, ClassStats, FILTERED_SUFFIX};
pub use tubelet::{crop_tubelet, plan_tubelets, segment, CropSummary, TubeletJob};
