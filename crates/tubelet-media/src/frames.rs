//! Frame directories and video decoding.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use tubelet_models::{FrameNaming, FrameRate};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{replace_dir, reset_dir, staging_path};

/// Image extensions counted as frames.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// A directory of per-frame images addressed by index.
#[derive(Debug, Clone)]
pub struct FrameDirectory {
    path: PathBuf,
    naming: FrameNaming,
}

impl FrameDirectory {
    pub fn new(path: impl Into<PathBuf>, naming: FrameNaming) -> Self {
        Self {
            path: path.into(),
            naming,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn naming(&self) -> &FrameNaming {
        &self.naming
    }

    /// Path of the image holding frame `index`.
    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.path.join(self.naming.file_name(index))
    }

    /// Frame indices present on disk, ascending.
    pub fn indices(&self) -> MediaResult<BTreeSet<u64>> {
        if !self.path.is_dir() {
            return Err(MediaError::FileNotFound(self.path.clone()));
        }
        let mut indices = BTreeSet::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if let Some(index) = entry
                .file_name()
                .to_str()
                .and_then(|name| self.naming.parse_index(name))
            {
                indices.insert(index);
            }
        }
        Ok(indices)
    }

    /// Highest frame index on disk, `None` for an empty directory.
    pub fn last_index(&self) -> MediaResult<Option<u64>> {
        Ok(self.indices()?.last().copied())
    }
}

/// Count image files directly inside `dir`.
pub fn count_images(dir: &Path) -> MediaResult<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_image && path.is_file() {
            count += 1;
        }
    }
    Ok(count)
}

/// Options for decoding one video into frames.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    pub naming: FrameNaming,
    /// Index given to the first decoded frame
    pub first_index: u64,
    pub rate: FrameRate,
}

/// Decode `video` into `dest`, replacing any previous contents.
///
/// Frames are written to a staging sibling of `dest` and swapped in once
/// ffmpeg succeeds. Returns the resulting frame directory and its last
/// frame index.
pub fn decode_video(
    runner: &FfmpegRunner,
    video: &Path,
    dest: &Path,
    options: &DecodeOptions,
) -> MediaResult<(FrameDirectory, u64)> {
    if !video.is_file() {
        return Err(MediaError::FileNotFound(video.to_path_buf()));
    }

    let staging = staging_path(dest);
    reset_dir(&staging)?;

    let mut cmd = FfmpegCommand::new(video, staging.join(options.naming.ffmpeg_pattern()))
        .start_number(options.first_index)
        .jpeg_quality(2);
    if let FrameRate::Fps(fps) = options.rate {
        cmd = cmd.frame_rate(fps);
    }

    if let Err(e) = runner.run(&cmd) {
        let _ = fs::remove_dir_all(&staging);
        return Err(e);
    }

    let staged = FrameDirectory::new(&staging, options.naming.clone());
    let Some(last) = staged.last_index()? else {
        let _ = fs::remove_dir_all(&staging);
        return Err(MediaError::NoFrames(dest.to_path_buf()));
    };

    replace_dir(&staging, dest)?;
    debug!(video = %video.display(), last_frame = last, "Decoded frames");

    Ok((FrameDirectory::new(dest, options.naming.clone()), last))
}
