//! Run counters.
//!
//! Emitted through the `metrics` facade; they are dropped unless the
//! embedding process installs a recorder.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const VIDEOS_ACQUIRED_TOTAL: &str = "tubelet_videos_acquired_total";
    pub const VIDEOS_FAILED_TOTAL: &str = "tubelet_videos_failed_total";
    pub const TUBELETS_WRITTEN_TOTAL: &str = "tubelet_tubelets_written_total";
    pub const FRAMES_WRITTEN_TOTAL: &str = "tubelet_frames_written_total";
    pub const FRAMES_SKIPPED_TOTAL: &str = "tubelet_frames_skipped_total";
}

pub fn record_video_acquired(dataset: &str) {
    let labels = [("dataset", dataset.to_string())];
    counter!(names::VIDEOS_ACQUIRED_TOTAL, &labels).increment(1);
}

pub fn record_video_failed(dataset: &str) {
    let labels = [("dataset", dataset.to_string())];
    counter!(names::VIDEOS_FAILED_TOTAL, &labels).increment(1);
}

pub fn record_tubelet(dataset: &str, written: usize, skipped: usize) {
    let labels = [("dataset", dataset.to_string())];
    counter!(names::TUBELETS_WRITTEN_TOTAL, &labels).increment(1);
    counter!(names::FRAMES_WRITTEN_TOTAL, &labels).increment(written as u64);
    counter!(names::FRAMES_SKIPPED_TOTAL, &labels).increment(skipped as u64);
}
