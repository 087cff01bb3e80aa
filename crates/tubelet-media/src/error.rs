//! Media error type.

use std::path::PathBuf;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg binary not found on PATH")]
    FfmpegNotFound,

    #[error("ffmpeg exited with status {status:?}: {stderr}")]
    FfmpegFailed { status: Option<i32>, stderr: String },

    #[error("Missing input: {0}")]
    FileNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Unreadable detector output: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Image decode/encode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Decoding produced no frame for {0}")]
    NoFrames(PathBuf),

    #[error("Person detector failed: {0}")]
    DetectionFailed(String),

    #[error("Detector model {0} does not exist")]
    ModelNotFound(PathBuf),

    #[error("{0}")]
    Internal(String),
}

impl MediaError {
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Build an ffmpeg failure from the process status and captured stderr.
    pub fn ffmpeg_failed(status: Option<i32>, stderr: &[u8]) -> Self {
        let stderr = String::from_utf8_lossy(stderr).trim().to_string();
        Self::FfmpegFailed {
            status,
            stderr: if stderr.is_empty() { "no output".to_string() } else { stderr },
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
