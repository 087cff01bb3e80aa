//! Frame file naming.

use serde::{Deserialize, Serialize};

/// Default prefix of decoded frame files.
pub const DEFAULT_FRAME_PREFIX: &str = "img_";
/// Default zero padding of decoded frame indices.
pub const DEFAULT_FRAME_WIDTH: usize = 5;
/// Default frame image extension.
pub const DEFAULT_FRAME_EXTENSION: &str = "jpg";

/// How frame indices map to file names inside a frame directory,
/// e.g. `img_00042.jpg` or `000042.jpg`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameNaming {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_prefix() -> String {
    DEFAULT_FRAME_PREFIX.to_string()
}
fn default_width() -> usize {
    DEFAULT_FRAME_WIDTH
}
fn default_extension() -> String {
    DEFAULT_FRAME_EXTENSION.to_string()
}

impl Default for FrameNaming {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            width: default_width(),
            extension: default_extension(),
        }
    }
}

impl FrameNaming {
    pub fn new(prefix: impl Into<String>, width: usize, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            width,
            extension: extension.into(),
        }
    }

    /// File stem for a frame index (`img_00042`).
    pub fn stem(&self, index: u64) -> String {
        format!("{}{:0width$}", self.prefix, index, width = self.width)
    }

    /// Full file name for a frame index (`img_00042.jpg`).
    pub fn file_name(&self, index: u64) -> String {
        format!("{}.{}", self.stem(index), self.extension)
    }

    /// printf-style pattern understood by ffmpeg's image2 muxer.
    pub fn ffmpeg_pattern(&self) -> String {
        format!("{}%0{}d.{}", self.prefix, self.width, self.extension)
    }

    /// Recover the frame index from a file name or stem.
    ///
    /// Accepts names with or without the extension so detector output keyed
    /// by stem (`img_00042`) and directory listings (`img_00042.jpg`) both
    /// resolve.
    pub fn parse_index(&self, name: &str) -> Option<u64> {
        let suffix = format!(".{}", self.extension);
        let stem = name.strip_suffix(suffix.as_str()).unwrap_or(name);
        let digits = stem.strip_prefix(self.prefix.as_str())?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}
