//! Generator error types.

use std::path::PathBuf;
use thiserror::Error;

pub type GeneratorResult<T> = Result<T, GeneratorError>;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Configuration error: {0}")]
    Config(#[from] tubelet_models::ConfigError),

    #[error("Adapter error: {0}")]
    Adapter(#[from] tubelet_datasets::AdapterError),

    #[error("Media error: {0}")]
    Media(#[from] tubelet_media::MediaError),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Worker pool error: {0}")]
    Pool(String),

    #[error("Required input missing: {0}")]
    MissingInput(PathBuf),

    #[error("Malformed manifest line {line} in {path}: {message}")]
    Manifest {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl GeneratorError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn manifest(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Whether the whole run must stop.
    ///
    /// Configuration problems are fatal. Failures of a single video or
    /// dataset are logged and the run moves on.
    pub fn is_fatal(&self) -> bool {
        match self {
            GeneratorError::Config(_) | GeneratorError::Pool(_) | GeneratorError::MissingInput(_) => true,
            GeneratorError::Adapter(e) => e.is_config(),
            _ => false,
        }
    }
}
