//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Problems with the configuration document. Always fatal: they are raised
/// before any dataset is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("'{key}' is missing in the {dataset} config")]
    MissingKey { dataset: String, key: &'static str },

    #[error("Unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("Dataset {0} is selected but has no entry in each_dataset_config")]
    MissingDataset(String),

    #[error("Invalid value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error("Dataset {0} ships no bounding boxes and no detector is configured")]
    MissingDetector(String),
}

impl ConfigError {
    /// Create a missing key error.
    pub fn missing_key(dataset: impl Into<String>, key: &'static str) -> Self {
        Self::MissingKey {
            dataset: dataset.into(),
            key,
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}
