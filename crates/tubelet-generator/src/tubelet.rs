//! Tubelet segmentation and cropping.
//!
//! A bounded record is cut into windows of at most `max_frames` frames.
//! Each window becomes one job writing the cropped frames of one tubelet
//! directory.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use tubelet_media::{crop_to_file, reset_dir, CropOutcome, FrameDirectory};
use tubelet_models::{BboxPolicy, BoundingBox, DatasetKind, TubeletName};

use crate::acquisition::AcquiredVideo;
use crate::error::{GeneratorError, GeneratorResult};
use crate::metrics;
use crate::resolver::WindowResolver;

/// Cut `[start, end)` into consecutive windows of at most `max_frames`.
///
/// The last window is shorter when the interval does not divide evenly.
pub fn segment(start: u64, end: u64, max_frames: usize) -> Vec<Range<u64>> {
    let step = max_frames.max(1) as u64;
    let mut windows = Vec::new();
    let mut lo = start;
    while lo < end {
        let hi = lo.saturating_add(step).min(end);
        windows.push(lo..hi);
        lo = hi;
    }
    windows
}

/// One tubelet to write.
#[derive(Debug, Clone)]
pub struct TubeletJob {
    pub name: TubeletName,
    pub window: Range<u64>,
    pub frames: FrameDirectory,
    /// Boxes of the window only
    pub boxes: BTreeMap<u64, BoundingBox>,
}

impl TubeletJob {
    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(self.name.to_string())
    }
}

/// Frame counts of one finished job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CropSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Expand acquired videos into tubelet jobs.
///
/// Source ids are unique per video key, so names only repeat for records
/// with the same video, activity, actor and range. Such a repeat is
/// dropped with a warning.
pub fn plan_tubelets(kind: DatasetKind, videos: &[AcquiredVideo], max_frames: usize) -> Vec<TubeletJob> {
    let mut seen = HashSet::new();
    let mut jobs = Vec::new();

    for video in videos {
        for record in &video.records {
            let Some(end) = record.end_frame else {
                continue;
            };
            let first = TubeletName::new(
                kind,
                &video.video_key,
                &record.activity,
                record.actor_id.as_deref(),
                record.start_frame,
                end,
                0,
            );
            if !seen.insert(first.clone()) {
                warn!(
                    dataset = %kind,
                    video = %video.video_key,
                    tubelet = %first,
                    "Duplicate record identity, dropped"
                );
                continue;
            }

            for (part, window) in segment(record.start_frame, end, max_frames).into_iter().enumerate() {
                let name = TubeletName { part, ..first.clone() };
                let boxes = record
                    .boxes
                    .range(window.clone())
                    .map(|(f, b)| (*f, *b))
                    .collect();
                jobs.push(TubeletJob {
                    name,
                    window,
                    frames: video.frames.clone(),
                    boxes,
                });
            }
        }
    }
    jobs
}

/// Write the cropped frames of one tubelet.
///
/// Output frames are renumbered `img_00000.jpg` upward without gaps. A
/// frame that is missing, fails to decode, has no box or crops to nothing
/// is skipped. A tubelet that ends up with no frame is removed.
pub fn crop_tubelet(job: &TubeletJob, policy: BboxPolicy, output_dir: &Path) -> GeneratorResult<CropSummary> {
    let dir = job.output_path(output_dir);
    reset_dir(&dir)?;

    let resolver = WindowResolver::new(job.window.clone(), &job.boxes, policy);
    let mut summary = CropSummary::default();

    for frame in job.window.clone() {
        let Some(bbox) = resolver.box_for(frame) else {
            debug!(tubelet = %job.name, frame, "No box for frame, skipped");
            summary.skipped += 1;
            continue;
        };

        let src = job.frames.frame_path(frame);
        let dst = dir.join(format!("img_{:05}.jpg", summary.written));
        match crop_to_file(&src, &bbox, &dst) {
            Ok(CropOutcome::Written { .. }) => summary.written += 1,
            Ok(CropOutcome::Degenerate) => {
                debug!(tubelet = %job.name, frame, "Box outside the image, skipped");
                summary.skipped += 1;
            }
            Err(e) => {
                debug!(tubelet = %job.name, frame, error = %e, "Frame crop failed, skipped");
                summary.skipped += 1;
            }
        }
    }

    if summary.written == 0 {
        fs::remove_dir_all(&dir).map_err(|e| GeneratorError::io(&dir, e))?;
        warn!(tubelet = %job.name, skipped = summary.skipped, "Tubelet has no usable frame, removed");
    } else {
        info!(
            tubelet = %job.name,
            written = summary.written,
            skipped = summary.skipped,
            "Tubelet written"
        );
    }

    metrics::record_tubelet(job.name.dataset.as_str(), summary.written, summary.skipped);
    Ok(summary)
}
