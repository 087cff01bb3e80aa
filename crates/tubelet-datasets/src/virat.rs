//! VIRAT: per-video annotations under `train/` and `validate/`.
//!
//! Each video stem is described either by a processed `{stem}.json` or by
//! the raw KPF triplet `{stem}.activities.yml`, `{stem}.types.yml` and
//! `{stem}.geom.yml`. Only tracks typed `Person` are kept. Frames are
//! 0-indexed and activity timespans are inclusive.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};
use tubelet_models::{normalize_component, ActivityRecord, BoundingBox, DatasetSettings, VideoRecords};

use crate::common::{file_name, files, find_by_stem, push_record, read_json, read_yaml, require_dir, AdapterOptions};
use crate::error::{AdapterError, AdapterResult};

pub const TRAIN_DIR: &str = "train";
pub const VALIDATE_DIR: &str = "validate";

const ACTIVITIES_SUFFIX: &str = ".activities.yml";
const TYPES_SUFFIX: &str = ".types.yml";
const GEOM_SUFFIX: &str = ".geom.yml";
const PERSON_TYPE: &str = "Person";

/// Processed per-video annotation: activities and boxes keyed by track id.
#[derive(Debug, Default, Deserialize)]
pub struct ProcessedAnnotation {
    #[serde(default)]
    pub activity: BTreeMap<String, Vec<TrackActivity>>,
    #[serde(default)]
    pub bbox: BTreeMap<String, TrackBoxes>,
}

#[derive(Debug, Deserialize)]
pub struct TrackActivity {
    pub activity: String,
    /// Inclusive `[first, last]` frame span
    pub tsr0: [u64; 2],
}

#[derive(Debug, Default, Deserialize)]
pub struct TrackBoxes {
    pub ts0: Vec<u64>,
    /// `"x1 y1 x2 y2"` per entry of `ts0`
    pub g0: Vec<String>,
}

// Raw KPF documents are lists of single-key maps; unrelated keys such as
// `meta` deserialize to an entry with every field empty.
#[derive(Debug, Deserialize)]
struct KpfEntry {
    types: Option<KpfTypes>,
    geom: Option<KpfGeom>,
    act: Option<KpfAct>,
}

#[derive(Debug, Deserialize)]
struct KpfTypes {
    id1: u64,
    #[serde(default)]
    cset3: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct KpfGeom {
    id1: u64,
    ts0: u64,
    g0: String,
}

#[derive(Debug, Deserialize)]
struct KpfAct {
    act2: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    actors: Vec<KpfActor>,
}

#[derive(Debug, Deserialize)]
struct KpfActor {
    id1: u64,
    timespan: Vec<KpfTimespan>,
}

#[derive(Debug, Deserialize)]
struct KpfTimespan {
    tsr0: [u64; 2],
}

pub fn check_config(settings: &DatasetSettings) -> AdapterResult<()> {
    settings.require("processed_annotations_dir", &settings.processed_annotations_dir)?;
    Ok(())
}

pub fn adapt(settings: &DatasetSettings, options: &AdapterOptions) -> AdapterResult<VideoRecords> {
    let annotations_dir = settings.require("processed_annotations_dir", &settings.processed_annotations_dir)?;
    require_dir(&settings.src_dir)?;

    let mut records = VideoRecords::new();
    for sub in [TRAIN_DIR, VALIDATE_DIR] {
        let dir = annotations_dir.join(sub);
        require_dir(&dir)?;

        for stem in annotation_stems(&dir)? {
            let annotation = load_annotation(&dir, &stem)?;
            let frame_source = find_by_stem(&settings.src_dir, &stem, settings.data_format)?
                .unwrap_or_else(|| settings.src_dir.join(format!("{}.mp4", stem)));
            let video_key = file_name(&frame_source);

            let mut kept = 0usize;
            for record in annotation_records(&annotation, &video_key, &frame_source, options) {
                if settings.allows(&record.activity) {
                    push_record(&mut records, record);
                    kept += 1;
                }
            }
            debug!(video = %video_key, split = sub, records = kept, "Parsed VIRAT annotation");
        }
    }
    Ok(records)
}

/// Readable source ids of the videos listed under `train/` and `validate/`.
pub fn split_lists(settings: &DatasetSettings) -> AdapterResult<(BTreeSet<String>, BTreeSet<String>)> {
    let annotations_dir = settings.require("processed_annotations_dir", &settings.processed_annotations_dir)?;
    let ids = |sub: &str| -> AdapterResult<BTreeSet<String>> {
        Ok(annotation_stems(&annotations_dir.join(sub))?
            .iter()
            .map(|stem| normalize_component(stem))
            .collect())
    };
    Ok((ids(TRAIN_DIR)?, ids(VALIDATE_DIR)?))
}

/// Video stems with either a processed JSON or a KPF activities file.
fn annotation_stems(dir: &Path) -> AdapterResult<BTreeSet<String>> {
    let mut stems = BTreeSet::new();
    for path in files(dir)? {
        let name = file_name(&path);
        if let Some(stem) = name
            .strip_suffix(ACTIVITIES_SUFFIX)
            .or_else(|| name.strip_suffix(".json"))
        {
            stems.insert(stem.to_string());
        }
    }
    Ok(stems)
}

fn load_annotation(dir: &Path, stem: &str) -> AdapterResult<ProcessedAnnotation> {
    let processed = dir.join(format!("{}.json", stem));
    if processed.is_file() {
        return read_json(&processed);
    }
    let kpf = |suffix: &str| -> PathBuf { dir.join(format!("{}{}", stem, suffix)) };
    from_kpf(&kpf(ACTIVITIES_SUFFIX), &kpf(TYPES_SUFFIX), &kpf(GEOM_SUFFIX))
}

/// Build the processed form from a raw KPF triplet.
fn from_kpf(activities: &Path, types: &Path, geom: &Path) -> AdapterResult<ProcessedAnnotation> {
    for path in [activities, types, geom] {
        if !path.is_file() {
            return Err(AdapterError::NotFound(path.to_path_buf()));
        }
    }

    let persons: BTreeSet<u64> = read_kpf(types)?
        .into_iter()
        .filter_map(|e| e.types)
        .filter(|t| t.cset3.contains_key(PERSON_TYPE))
        .map(|t| t.id1)
        .collect();

    let mut annotation = ProcessedAnnotation::default();
    for geom in read_kpf(geom)?.into_iter().filter_map(|e| e.geom) {
        if persons.contains(&geom.id1) {
            let track = annotation.bbox.entry(geom.id1.to_string()).or_default();
            track.ts0.push(geom.ts0);
            track.g0.push(geom.g0);
        }
    }

    for act in read_kpf(activities)?.into_iter().filter_map(|e| e.act) {
        let Some(label) = act.act2.keys().next() else {
            continue;
        };
        for actor in act.actors.iter().filter(|a| persons.contains(&a.id1)) {
            let Some(span) = actor.timespan.first() else {
                continue;
            };
            annotation
                .activity
                .entry(actor.id1.to_string())
                .or_default()
                .push(TrackActivity {
                    activity: label.clone(),
                    tsr0: span.tsr0,
                });
        }
    }
    Ok(annotation)
}

fn read_kpf(path: &Path) -> AdapterResult<Vec<KpfEntry>> {
    let entries: Option<Vec<KpfEntry>> = read_yaml(path)?;
    Ok(entries.unwrap_or_default())
}

fn annotation_records(
    annotation: &ProcessedAnnotation,
    video_key: &str,
    frame_source: &Path,
    options: &AdapterOptions,
) -> Vec<ActivityRecord> {
    let mut records = Vec::new();
    for (track_id, activities) in &annotation.activity {
        let boxes = annotation
            .bbox
            .get(track_id)
            .map(|t| track_boxes(t, options.min_box_size))
            .unwrap_or_default();
        if boxes.is_empty() {
            warn!(video = %video_key, track = %track_id, "Track has no usable boxes");
        }

        for act in activities {
            let first = act.tsr0[0].min(act.tsr0[1]);
            let last = act.tsr0[0].max(act.tsr0[1]);
            let mut record = ActivityRecord::new(video_key, &act.activity, first, last + 1, frame_source)
                .with_actor(track_id);
            record.attach_boxes(boxes.iter().map(|(f, b)| (*f, *b)));
            records.push(record);
        }
    }
    records
}

fn track_boxes(track: &TrackBoxes, min_box_size: f64) -> BTreeMap<u64, BoundingBox> {
    track
        .ts0
        .iter()
        .zip(&track.g0)
        .filter_map(|(frame, g0)| Some((*frame, BoundingBox::parse_corners(g0)?)))
        .filter(|(_, b)| b.is_at_least(min_box_size))
        .collect()
}
