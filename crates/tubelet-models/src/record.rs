//! Canonical activity records produced by every dataset adapter.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// Video key → ordered activity records for that video.
pub type VideoRecords = BTreeMap<String, Vec<ActivityRecord>>;

/// One contiguous occurrence of one activity by one actor in one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Opaque key of the source video, unique within its dataset.
    pub video_key: String,
    /// Dataset-native activity label.
    pub activity: String,
    /// Track or person id, when the source annotates one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    /// First frame of the half-open interval.
    pub start_frame: u64,
    /// End of the half-open interval; `None` runs to the last decoded frame.
    #[serde(default)]
    pub end_frame: Option<u64>,
    /// Video file (pending decode) or directory of decoded frames.
    pub frame_source: PathBuf,
    /// Per-frame boxes, all keys inside `[start_frame, end_frame)`.
    #[serde(default)]
    pub boxes: BTreeMap<u64, BoundingBox>,
}

impl ActivityRecord {
    /// Record covering `[start_frame, end_frame)`.
    pub fn new(
        video_key: impl Into<String>,
        activity: impl Into<String>,
        start_frame: u64,
        end_frame: u64,
        frame_source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            video_key: video_key.into(),
            activity: activity.into(),
            actor_id: None,
            start_frame,
            end_frame: Some(end_frame),
            frame_source: frame_source.into(),
            boxes: BTreeMap::new(),
        }
    }

    /// Record spanning a whole clip whose length is only known after decoding.
    pub fn whole_clip(
        video_key: impl Into<String>,
        activity: impl Into<String>,
        first_frame: u64,
        frame_source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            video_key: video_key.into(),
            activity: activity.into(),
            actor_id: None,
            start_frame: first_frame,
            end_frame: None,
            frame_source: frame_source.into(),
            boxes: BTreeMap::new(),
        }
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// True when the record describes a non-empty interval.
    pub fn is_valid(&self) -> bool {
        self.end_frame.map_or(true, |end| end > self.start_frame)
    }

    /// Whether `frame` lies inside the record's interval.
    pub fn contains(&self, frame: u64) -> bool {
        frame >= self.start_frame && self.end_frame.map_or(true, |end| frame < end)
    }

    /// Attach boxes, keeping only those inside the record's interval.
    pub fn attach_boxes<I>(&mut self, boxes: I)
    where
        I: IntoIterator<Item = (u64, BoundingBox)>,
    {
        for (frame, bbox) in boxes {
            if self.contains(frame) {
                self.boxes.insert(frame, bbox);
            }
        }
    }

    /// Concrete `[start, end)` once the last available frame is known.
    ///
    /// The interval is truncated to `last_frame + 1` and `None` is returned
    /// when nothing remains.
    pub fn bounded_range(&self, last_frame: u64) -> Option<(u64, u64)> {
        let available_end = last_frame.saturating_add(1);
        let end = self
            .end_frame
            .map_or(available_end, |end| end.min(available_end));
        (end > self.start_frame).then_some((self.start_frame, end))
    }
}
