//! JRDB-Act: one label JSON per camera sequence.
//!
//! A label file `{sequence}_{N}.json` describes the pre-extracted frames in
//! `src_dir/image_{N}/{sequence}`. Each frame lists pedestrians with a COCO
//! box and zero or more action labels.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, warn};
use tubelet_models::{BoundingBox, DatasetSettings, VideoRecords};

use crate::common::{file_stem, files, merge_observations, push_record, read_json, require_dir, AdapterOptions, Observation};
use crate::error::AdapterResult;

#[derive(Debug, Deserialize)]
struct LabelFile {
    #[serde(default)]
    labels: BTreeMap<String, Vec<PedestrianLabel>>,
}

#[derive(Debug, Deserialize)]
struct PedestrianLabel {
    /// `pedestrian:ID`
    label_id: String,
    #[serde(default)]
    action_label: BTreeMap<String, serde_json::Value>,
    /// COCO `[x, y, width, height]`
    #[serde(rename = "box")]
    bbox: [f64; 4],
    /// Frame image name, e.g. `000123.jpg`
    file_id: String,
}

pub fn check_config(settings: &DatasetSettings) -> AdapterResult<()> {
    settings.require("labels_dir", &settings.labels_dir)?;
    Ok(())
}

pub fn adapt(settings: &DatasetSettings, options: &AdapterOptions) -> AdapterResult<VideoRecords> {
    let labels_dir = settings.require("labels_dir", &settings.labels_dir)?;
    require_dir(labels_dir)?;

    let mut records = VideoRecords::new();
    for label_path in files(labels_dir)? {
        if label_path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let video_key = file_stem(&label_path);
        let Some(frames_dir) = frames_dir_for(&settings.src_dir, &video_key) else {
            warn!(file = %label_path.display(), "Label file name does not encode a camera index");
            continue;
        };

        let labels: LabelFile = read_json(&label_path)?;
        let observations = labels
            .labels
            .into_values()
            .flatten()
            .flat_map(|label| observations_of(label, &settings.frame_naming))
            .filter(|obs| settings.allows(&obs.activity));

        let intervals = merge_observations(observations, options);
        debug!(sequence = %video_key, records = intervals.len(), "Parsed JRDB-Act labels");
        for interval in intervals {
            push_record(&mut records, interval.into_record(&video_key, &frames_dir));
        }
    }
    Ok(records)
}

/// `bytes-cafe-2019-02-07_0` → `src_dir/image_0/bytes-cafe-2019-02-07`.
fn frames_dir_for(src_dir: &std::path::Path, video_key: &str) -> Option<PathBuf> {
    let (sequence, camera) = video_key.rsplit_once('_')?;
    let camera = camera.chars().last().filter(|c| c.is_ascii_digit())?;
    Some(src_dir.join(format!("image_{}", camera)).join(sequence))
}

fn observations_of(label: PedestrianLabel, naming: &tubelet_models::FrameNaming) -> Vec<Observation> {
    let Some(frame) = naming.parse_index(&label.file_id) else {
        debug!(file_id = %label.file_id, "Unrecognized frame file");
        return Vec::new();
    };
    let actor = label
        .label_id
        .rsplit(':')
        .next()
        .unwrap_or(&label.label_id)
        .to_string();
    let [x, y, w, h] = label.bbox;
    let bbox = BoundingBox::from_xywh(x, y, w, h);

    label
        .action_label
        .into_keys()
        .map(|action| Observation {
            actor: Some(actor.clone()),
            activity: action.to_lowercase(),
            frame,
            bbox,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;
    use tubelet_models::{DataFormat, DatasetKind};

    fn label(pid: u32, frame: u64, actions: &[&str], w: f64) -> String {
        let actions: Vec<String> = actions.iter().map(|a| format!("\"{}\": 1", a)).collect();
        format!(
            r#"{{"label_id": "pedestrian:{}", "action_label": {{{}}}, "box": [10, 20, {}, 60], "file_id": "{:06}.jpg"}}"#,
            pid,
            actions.join(", "),
            w,
            frame
        )
    }

    #[test]
    fn test_frames_dir_for() {
        assert_eq!(
            frames_dir_for(Path::new("/jrdb"), "bytes-cafe-2019-02-07_0"),
            Some(PathBuf::from("/jrdb/image_0/bytes-cafe-2019-02-07"))
        );
        assert_eq!(frames_dir_for(Path::new("/jrdb"), "nocamera"), None);
    }

    #[test]
    fn test_adapt_groups_and_merges() {
        let dir = TempDir::new().unwrap();
        let labels_dir = dir.path().join("labels");
        fs::create_dir_all(&labels_dir).unwrap();

        let doc = format!(
            r#"{{"labels": {{
                "000000.jpg": [{}, {}],
                "000001.jpg": [{}],
                "000002.jpg": [{}],
                "000009.jpg": [{}]
            }}}}"#,
            label(1, 0, &["Walking", "talking on the phone"], 30.0),
            label(2, 0, &["standing"], 5.0),
            label(1, 1, &["walking"], 30.0),
            label(1, 2, &[], 30.0),
            label(1, 9, &["walking"], 30.0),
        );
        fs::write(labels_dir.join("gates-hall_2.json"), doc).unwrap();

        let mut settings = DatasetSettings::new(DatasetKind::JrdbAct, dir.path(), DataFormat::Frames, true, 15.0);
        settings.labels_dir = Some(labels_dir);

        let records = adapt(&settings, &AdapterOptions::default()).unwrap();
        let recs = &records["gates-hall_2"];
        let summary: Vec<_> = recs
            .iter()
            .map(|r| (r.activity.as_str(), r.start_frame, r.end_frame.unwrap()))
            .collect();
        // pedestrian 2's box is too narrow; frame 9 starts a new walking interval
        assert_eq!(
            summary,
            vec![("talking on the phone", 0, 1), ("walking", 0, 2), ("walking", 9, 10)]
        );
        assert_eq!(recs[1].boxes[&0], BoundingBox::new(10.0, 20.0, 40.0, 80.0));
        assert_eq!(recs[0].frame_source, dir.path().join("image_2").join("gates-hall"));
    }
}
