//! Structured logging.
//!
//! Installs the tracing subscriber and provides a per-dataset logger with
//! consistent contextual fields.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `LOG_FORMAT=json` switches to JSON lines;
/// `RUST_LOG` adds filter directives.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = ["tubelet=info", "ort=warn"]
        .iter()
        .filter_map(|d| d.parse().ok())
        .fold(EnvFilter::from_default_env(), EnvFilter::add_directive);

    let registry = tracing_subscriber::registry().with(filter);
    if use_json {
        registry.with(fmt::layer().json().with_current_span(true)).init();
    } else {
        registry.with(fmt::layer().with_thread_names(true)).init();
    }
}

/// Logger for one dataset passing through one phase.
#[derive(Debug, Clone)]
pub struct DatasetLogger {
    dataset: String,
    phase: String,
}

impl DatasetLogger {
    pub fn new(dataset: impl ToString, phase: &str) -> Self {
        Self {
            dataset: dataset.to_string(),
            phase: phase.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(dataset = %self.dataset, phase = %self.phase, "start: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(dataset = %self.dataset, phase = %self.phase, "{}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(dataset = %self.dataset, phase = %self.phase, "{}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(dataset = %self.dataset, phase = %self.phase, "{}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(dataset = %self.dataset, phase = %self.phase, "done: {}", message);
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// Span grouping every event emitted while the dataset is processed.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "dataset",
            dataset = %self.dataset,
            phase = %self.phase
        )
    }
}
