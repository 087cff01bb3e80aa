//! Frame extraction, cropping and person detection for tubelet generation.
//!
//! This crate provides:
//! - A typed FFmpeg command builder and blocking runner
//! - Frame directories addressed by index, and video decoding into them
//! - Bounding-box cropping
//! - The person detector oracle used for datasets without boxes

pub mod command;
pub mod crop;
pub mod detection;
pub mod error;
pub mod frames;
pub mod fs_utils;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use crop::{crop_to_file, CropOutcome};
pub use detection::{detector_from_config, index_detections, CommandDetector, Detections, PersonDetector};
pub use error::{MediaError, MediaResult};
pub use frames::{count_images, decode_video, DecodeOptions, FrameDirectory};
pub use fs_utils::{replace_dir, reset_dir, staging_path};
