//! Okutama-Action single-action labels.
//!
//! Rows are `tid xmin ymin xmax ymax frame lost occluded generated label
//! action`, one label file per video sharing the video's stem.

use tracing::{debug, warn};
use tubelet_models::{BoundingBox, DatasetSettings, VideoRecords};

use crate::common::{
    file_name, file_stem, files, find_by_stem, merge_observations, push_record, read_text, require_dir,
    AdapterOptions, Observation,
};
use crate::error::AdapterResult;

const MIN_COLUMNS: usize = 11;

pub fn check_config(settings: &DatasetSettings) -> AdapterResult<()> {
    settings.require("labels_dir", &settings.labels_dir)?;
    Ok(())
}

pub fn adapt(settings: &DatasetSettings, options: &AdapterOptions) -> AdapterResult<VideoRecords> {
    let labels_dir = settings.require("labels_dir", &settings.labels_dir)?;
    require_dir(labels_dir)?;
    require_dir(&settings.src_dir)?;

    let mut records = VideoRecords::new();
    for label_path in files(labels_dir)? {
        let stem = file_stem(&label_path);
        let Some(source) = find_by_stem(&settings.src_dir, &stem, settings.data_format)? else {
            warn!(labels = %label_path.display(), "No video matches label file, skipping");
            continue;
        };
        let video_key = file_name(&source);

        let text = read_text(&label_path)?;
        let mut dropped = 0usize;
        let observations: Vec<Observation> = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .filter_map(|line| {
                let obs = parse_row(line);
                if obs.is_none() {
                    dropped += 1;
                }
                obs
            })
            .filter(|obs| settings.allows(&obs.activity))
            .collect();

        let intervals = merge_observations(observations, options);
        debug!(video = %video_key, records = intervals.len(), dropped, "Parsed Okutama labels");
        for interval in intervals {
            push_record(&mut records, interval.into_record(&video_key, &source));
        }
    }
    Ok(records)
}

/// Parse one label row; lost or malformed rows yield `None`.
fn parse_row(line: &str) -> Option<Observation> {
    let cols: Vec<&str> = line.split_whitespace().collect();
    if cols.len() < MIN_COLUMNS {
        return None;
    }
    let num = |i: usize| cols[i].parse::<f64>().ok();

    if cols[6] == "1" {
        return None;
    }
    let frame = cols[5].parse::<u64>().ok()?;
    let bbox = BoundingBox::new(num(1)?, num(2)?, num(3)?, num(4)?);
    let activity = normalize_action(&cols[10..].join(" "));
    if activity.is_empty() {
        return None;
    }

    Some(Observation {
        actor: Some(cols[0].to_string()),
        activity,
        frame,
        bbox,
    })
}

fn normalize_action(raw: &str) -> String {
    raw.trim()
        .replace('"', "")
        .replace('/', "_")
        .replace('\\', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tubelet_models::{DataFormat, DatasetKind};

    #[test]
    fn test_parse_row() {
        let obs = parse_row(r#"3 100 200 160 330 42 0 1 0 "Person" "Reading/Calling""#).unwrap();
        assert_eq!(obs.actor.as_deref(), Some("3"));
        assert_eq!(obs.frame, 42);
        assert_eq!(obs.activity, "Reading_Calling");
        assert_eq!(obs.bbox, BoundingBox::new(100.0, 200.0, 160.0, 330.0));

        assert!(parse_row(r#"3 100 200 160 330 42 1 0 0 "Person" "Walking""#).is_none(), "lost row");
        assert!(parse_row("3 100 200 160 330 42 0 0 0 \"Person\"").is_none(), "no action");
        assert!(parse_row(r#"3 a 200 160 330 42 0 0 0 "Person" "Walking""#).is_none());
    }

    #[test]
    fn test_adapt() {
        let dir = TempDir::new().unwrap();
        let labels = dir.path().join("labels");
        let videos = dir.path().join("videos");
        fs::create_dir_all(&labels).unwrap();
        fs::create_dir_all(&videos).unwrap();
        fs::write(videos.join("1.1.1.mov"), b"").unwrap();

        let rows = [
            r#"0 10 10 60 120 0 0 0 0 "Person" "Walking""#,
            r#"0 11 10 61 120 1 0 0 0 "Person" "Walking""#,
            r#"0 12 10 62 120 2 1 0 0 "Person" "Walking""#,
            r#"1 300 10 360 120 0 0 0 0 "Person" "Sitting""#,
        ];
        fs::write(labels.join("1.1.1.txt"), rows.join("\n")).unwrap();
        fs::write(labels.join("9.9.9.txt"), rows[0]).unwrap();

        let mut settings = DatasetSettings::new(DatasetKind::Okutama, &videos, DataFormat::Video, true, 30.0);
        settings.labels_dir = Some(labels);
        settings.allow_list = Some(["Walking".to_string()].into_iter().collect());

        let records = adapt(&settings, &AdapterOptions::default()).unwrap();
        assert_eq!(records.len(), 1, "label file without video is skipped");
        let recs = &records["1.1.1.mov"];
        assert_eq!(recs.len(), 1);
        assert_eq!((recs[0].start_frame, recs[0].end_frame), (0, Some(2)));
        assert_eq!(recs[0].frame_source, videos.join("1.1.1.mov"));
    }
}
