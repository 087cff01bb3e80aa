//! Cropping frames to a bounding box.

use std::path::Path;

use tubelet_models::BoundingBox;

use crate::error::{MediaError, MediaResult};

/// Result of cropping one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropOutcome {
    Written { width: u32, height: u32 },
    /// The box does not overlap the image.
    Degenerate,
}

/// Crop `src` to `bbox` (clamped to the image) and write the result to `dst`.
///
/// The output format follows the extension of `dst`.
pub fn crop_to_file(src: &Path, bbox: &BoundingBox, dst: &Path) -> MediaResult<CropOutcome> {
    if !src.is_file() {
        return Err(MediaError::FileNotFound(src.to_path_buf()));
    }
    let img = image::open(src)?;

    let Some(rect) = bbox.clamp_to(img.width(), img.height()) else {
        return Ok(CropOutcome::Degenerate);
    };

    let cropped = img.crop_imm(rect.x, rect.y, rect.width, rect.height);
    cropped.save(dst)?;

    Ok(CropOutcome::Written {
        width: rect.width,
        height: rect.height,
    })
}
