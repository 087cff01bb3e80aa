//! Rules shared by every adapter: observation merging, box filtering and
//! directory walking.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tubelet_models::config::{DEFAULT_MERGE_GAP, DEFAULT_MIN_BOX_SIZE};
use tubelet_models::{ActivityRecord, BoundingBox, DataFormat, VideoRecords};

use crate::error::{AdapterError, AdapterResult};

/// Tunables applied while turning per-frame observations into intervals.
#[derive(Debug, Clone, Copy)]
pub struct AdapterOptions {
    /// Frame distance at which a new interval starts
    pub merge_gap: u64,
    /// Minimum box width and height in pixels
    pub min_box_size: f64,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            merge_gap: DEFAULT_MERGE_GAP,
            min_box_size: DEFAULT_MIN_BOX_SIZE,
        }
    }
}

/// One annotated box of one actor doing one activity in one frame.
#[derive(Debug, Clone)]
pub struct Observation {
    pub actor: Option<String>,
    pub activity: String,
    pub frame: u64,
    pub bbox: BoundingBox,
}

/// A merged run of observations, `[start, end)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub actor: Option<String>,
    pub activity: String,
    pub start: u64,
    pub end: u64,
    pub boxes: BTreeMap<u64, BoundingBox>,
}

impl Interval {
    /// Turn into a record of `video_key`.
    pub fn into_record(self, video_key: &str, frame_source: &Path) -> ActivityRecord {
        let mut record = ActivityRecord::new(video_key, self.activity, self.start, self.end, frame_source);
        if let Some(actor) = self.actor {
            record = record.with_actor(actor);
        }
        record.attach_boxes(self.boxes);
        record
    }
}

/// Group observations by `(actor, activity)` and merge each group into
/// intervals.
///
/// Boxes smaller than `min_box_size` are discarded first. Within a group,
/// frames are visited in order and a new interval starts whenever the
/// distance to the previous frame reaches `merge_gap`. Output is ordered by
/// actor, activity and start frame.
pub fn merge_observations<I>(observations: I, options: &AdapterOptions) -> Vec<Interval>
where
    I: IntoIterator<Item = Observation>,
{
    let mut groups: BTreeMap<(Option<String>, String), BTreeMap<u64, BoundingBox>> = BTreeMap::new();
    for obs in observations {
        if !obs.bbox.is_at_least(options.min_box_size) {
            continue;
        }
        groups
            .entry((obs.actor, obs.activity))
            .or_default()
            .insert(obs.frame, obs.bbox);
    }

    let mut intervals = Vec::new();
    for ((actor, activity), frames) in groups {
        let mut current: Option<Interval> = None;
        for (frame, bbox) in frames {
            match current.as_mut() {
                Some(interval) if frame - (interval.end - 1) < options.merge_gap => {
                    interval.end = frame + 1;
                    interval.boxes.insert(frame, bbox);
                }
                _ => {
                    intervals.extend(current.take());
                    current = Some(Interval {
                        actor: actor.clone(),
                        activity: activity.clone(),
                        start: frame,
                        end: frame + 1,
                        boxes: BTreeMap::from([(frame, bbox)]),
                    });
                }
            }
        }
        intervals.extend(current);
    }
    intervals
}

/// Append a record under its video key.
pub fn push_record(records: &mut VideoRecords, record: ActivityRecord) {
    records
        .entry(record.video_key.clone())
        .or_default()
        .push(record);
}

/// Fail unless `path` is an existing directory.
pub fn require_dir(path: &Path) -> AdapterResult<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(AdapterError::NotFound(path.to_path_buf()))
    }
}

pub fn read_text(path: &Path) -> AdapterResult<String> {
    fs::read_to_string(path).map_err(|e| AdapterError::io(path, e))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> AdapterResult<T> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|source| AdapterError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> AdapterResult<T> {
    let text = read_text(path)?;
    serde_yaml::from_str(&text).map_err(|source| AdapterError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Entries of `dir`, sorted by path. Hidden entries are skipped.
pub fn sorted_entries(dir: &Path) -> AdapterResult<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| AdapterError::io(dir, e))? {
        let entry = entry.map_err(|e| AdapterError::io(dir, e))?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        entries.push(entry.path());
    }
    entries.sort();
    Ok(entries)
}

pub fn sub_dirs(dir: &Path) -> AdapterResult<Vec<PathBuf>> {
    Ok(sorted_entries(dir)?.into_iter().filter(|p| p.is_dir()).collect())
}

pub fn files(dir: &Path) -> AdapterResult<Vec<PathBuf>> {
    Ok(sorted_entries(dir)?.into_iter().filter(|p| p.is_file()).collect())
}

/// Source entries of a clip directory: video files or frame directories
/// depending on the dataset's data format.
pub fn clip_sources(dir: &Path, format: DataFormat) -> AdapterResult<Vec<PathBuf>> {
    match format {
        DataFormat::Video => files(dir),
        DataFormat::Frames => sub_dirs(dir),
    }
}

/// Find the entry of `dir` whose stem is `stem` (a frame directory or a
/// video file, depending on `format`).
pub fn find_by_stem(dir: &Path, stem: &str, format: DataFormat) -> AdapterResult<Option<PathBuf>> {
    Ok(clip_sources(dir, format)?
        .into_iter()
        .find(|p| file_stem(p) == stem))
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `path` relative to `root`, `/`-joined.
pub fn relative_key(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
