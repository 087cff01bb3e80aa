//! Loading the configuration document.

use std::path::Path;

use tubelet_models::{ConfigError, ConfigResult, GeneratorConfig};

/// Environment variable overriding `global_settings.workers`.
pub const WORKERS_ENV: &str = "TUBELET_WORKERS";

/// Read and parse the configuration document at `path`, then apply
/// environment overrides.
///
/// Validation is left to [`GeneratorConfig::validate`] so callers can
/// decide which datasets need to be resolved.
pub fn load_config(path: &Path) -> ConfigResult<GeneratorConfig> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = GeneratorConfig::from_json(&text)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

fn apply_env_overrides<F>(config: &mut GeneratorConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(WORKERS_ENV) {
        let workers = raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::invalid_value(WORKERS_ENV, format!("expected a positive integer, got '{}'", raw)))?;
        config.global_settings.workers = Some(workers);
    }
    Ok(())
}

/// Worker pool size: sequential mode forces one thread, otherwise the
/// configured count or the number of CPUs.
pub fn worker_count(config: &GeneratorConfig) -> usize {
    use tubelet_models::ProcessingMode;

    match config.global_settings.processing_mode {
        ProcessingMode::Sequential => 1,
        ProcessingMode::Parallel => config
            .global_settings
            .workers
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tubelet_models::ProcessingMode;

    const DOC: &str = r#"{
        "global_settings": {
            "output_dir": "out",
            "max_duration": 2,
            "min_duration": 1,
            "bbox_variation": "org"
        }
    }"#;

    #[test]
    fn test_load_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("generator_config.json");
        std::fs::write(&path, DOC).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.global_settings.output_dir, std::path::PathBuf::from("out"));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_config(Path::new("/nonexistent/config.json")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_worker_override() {
        let mut config = GeneratorConfig::from_json(DOC).unwrap();
        apply_env_overrides(&mut config, |_| Some("3".into())).unwrap();
        assert_eq!(config.global_settings.workers, Some(3));
        assert_eq!(worker_count(&config), 3);

        config.global_settings.processing_mode = ProcessingMode::Sequential;
        assert_eq!(worker_count(&config), 1);

        assert!(apply_env_overrides(&mut config, |_| Some("zero".into())).is_err());
        assert!(apply_env_overrides(&mut config, |_| Some("0".into())).is_err());
    }
}
