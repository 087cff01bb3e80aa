//! Frame extraction with ffmpeg.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// One ffmpeg invocation turning a video into numbered images.
///
/// Arguments are laid out as
/// `-y -v error -i <video> [-r fps] [-start_number n] [-q:v q] <pattern>`.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    video: PathBuf,
    pattern: PathBuf,
    rate: Option<f64>,
    start_number: Option<u64>,
    quality: Option<u8>,
}

impl FfmpegCommand {
    /// Extract every frame of `video` into the image2 `pattern`.
    pub fn new(video: impl AsRef<Path>, pattern: impl AsRef<Path>) -> Self {
        Self {
            video: video.as_ref().to_path_buf(),
            pattern: pattern.as_ref().to_path_buf(),
            rate: None,
            start_number: None,
            quality: None,
        }
    }

    /// Resample to `fps` frames per second instead of the native rate.
    pub fn frame_rate(mut self, fps: f64) -> Self {
        self.rate = Some(fps);
        self
    }

    /// Number the first image `index`.
    pub fn start_number(mut self, index: u64) -> Self {
        self.start_number = Some(index);
        self
    }

    /// JPEG quality scale, 2 being the best useful value.
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec!["-y".into(), "-v".into(), "error".into()];
        args.push("-i".into());
        args.push(self.video.to_string_lossy().into_owned());

        if let Some(fps) = self.rate {
            args.extend(["-r".to_string(), fps.to_string()]);
        }
        if let Some(n) = self.start_number {
            args.extend(["-start_number".to_string(), n.to_string()]);
        }
        if let Some(q) = self.quality {
            args.extend(["-q:v".to_string(), q.to_string()]);
        }

        args.push(self.pattern.to_string_lossy().into_owned());
        args
    }
}

/// Runs ffmpeg synchronously on the calling thread.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    binary: PathBuf,
}

impl FfmpegRunner {
    /// Runner for the ffmpeg found on `PATH`.
    pub fn new() -> MediaResult<Self> {
        Ok(Self {
            binary: check_ffmpeg()?,
        })
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let args = cmd.build_args();
        debug!(ffmpeg = %self.binary.display(), args = %args.join(" "), "Extracting frames");

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()?;

        if !output.status.success() {
            return Err(MediaError::ffmpeg_failed(output.status.code(), &output.stderr));
        }
        Ok(())
    }
}

/// Path of the ffmpeg binary on `PATH`.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_order() {
        let args = FfmpegCommand::new("input.avi", "out/img_%05d.jpg")
            .start_number(1)
            .frame_rate(10.0)
            .jpeg_quality(2)
            .build_args();

        assert_eq!(
            args,
            vec![
                "-y", "-v", "error", "-i", "input.avi", "-r", "10", "-start_number", "1", "-q:v", "2",
                "out/img_%05d.jpg",
            ]
        );
    }

    #[test]
    fn test_native_rate_has_no_r_flag() {
        let args = FfmpegCommand::new("a.mp4", "img_%05d.jpg").build_args();
        assert!(!args.iter().any(|a| a == "-r"));
    }

    #[test]
    fn test_missing_binary_is_an_io_error() {
        let runner = FfmpegRunner::with_binary("/nonexistent/ffmpeg-binary");
        let cmd = FfmpegCommand::new("a.avi", "b.jpg");
        assert!(matches!(runner.run(&cmd), Err(MediaError::Io(_))));
    }
}
