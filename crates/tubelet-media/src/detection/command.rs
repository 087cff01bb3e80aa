//! Detector backed by an external program.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use super::{Detections, PersonDetector};
use crate::error::{MediaError, MediaResult};

/// Runs `program [args..] <frame_dir>` and reads a JSON object
/// `{"img_00001": [x1, y1, x2, y2], ...}` from its stdout.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: PathBuf,
    args: Vec<String>,
    name: String,
}

impl CommandDetector {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        let program = program.into();
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.to_string_lossy().into_owned());
        Self { program, args, name }
    }
}

impl PersonDetector for CommandDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect_dir(&self, dir: &Path) -> MediaResult<Detections> {
        if !dir.is_dir() {
            return Err(MediaError::FileNotFound(dir.to_path_buf()));
        }
        debug!(detector = %self.name, dir = %dir.display(), "Running person detector");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::detection_failed(format!(
                "{} exited with {:?}: {}",
                self.name,
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tubelet_models::BoundingBox;

    #[test]
    fn test_parses_program_output() {
        let dir = TempDir::new().unwrap();
        // The frame directory lands in $0 of the inline script.
        let detector = CommandDetector::new(
            "sh",
            vec![
                "-c".into(),
                r#"printf '{"img_00001": [1, 2, 30, 40], "img_00002": [5, 5, 25, 45]}'"#.into(),
            ],
        );
        let detections = detector.detect_dir(dir.path()).unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections["img_00001"], BoundingBox::new(1.0, 2.0, 30.0, 40.0));
    }

    #[test]
    fn test_failing_program() {
        let dir = TempDir::new().unwrap();
        let detector = CommandDetector::new("sh", vec!["-c".into(), "exit 3".into()]);
        assert!(matches!(
            detector.detect_dir(dir.path()),
            Err(MediaError::DetectionFailed(_))
        ));
    }

    #[test]
    fn test_invalid_json() {
        let dir = TempDir::new().unwrap();
        let detector = CommandDetector::new("sh", vec!["-c".into(), "echo not-json".into()]);
        assert!(matches!(
            detector.detect_dir(dir.path()),
            Err(MediaError::JsonParse(_))
        ));
    }
}
