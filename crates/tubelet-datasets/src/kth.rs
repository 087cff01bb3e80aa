//! KTH: `personNN_action_dK  frames  a-b, c-d, ...` sequence lines.
//!
//! Each listed range is one record of the whole video's single actor.
//! Ranges are 1-indexed and inclusive. KTH ships no boxes.

use tracing::debug;
use tubelet_models::{ActivityRecord, DataFormat, DatasetSettings, VideoRecords};

use crate::common::{push_record, read_text, require_dir};
use crate::error::{AdapterError, AdapterResult};

const FRAMES_TOKEN: &str = "frames";

pub fn check_config(settings: &DatasetSettings) -> AdapterResult<()> {
    settings.require("sequence_file", &settings.sequence_file)?;
    Ok(())
}

pub fn adapt(settings: &DatasetSettings) -> AdapterResult<VideoRecords> {
    let sequence_file = settings.require("sequence_file", &settings.sequence_file)?;
    if !sequence_file.is_file() {
        return Err(AdapterError::NotFound(sequence_file.to_path_buf()));
    }
    require_dir(&settings.src_dir)?;

    let mut records = VideoRecords::new();
    for (line_no, line) in read_text(sequence_file)?.lines().enumerate() {
        let Some(sequence) = parse_line(line) else {
            if !line.trim().is_empty() {
                debug!(line = line_no + 1, "Skipping non-sequence line");
            }
            continue;
        };
        if !settings.allows(&sequence.activity) {
            continue;
        }

        let video_key = format!("{}_uncomp.avi", sequence.name);
        let frame_source = match settings.data_format {
            DataFormat::Video => settings.src_dir.join(&video_key),
            DataFormat::Frames => settings.src_dir.join(format!("{}_uncomp", sequence.name)),
        };

        for (first, last) in sequence.ranges {
            let record = ActivityRecord::new(&video_key, &sequence.activity, first, last + 1, &frame_source)
                .with_actor(&sequence.person);
            if record.is_valid() {
                push_record(&mut records, record);
            } else {
                debug!(video = %video_key, first, last, "Dropping empty range");
            }
        }
    }
    Ok(records)
}

#[derive(Debug, PartialEq)]
struct Sequence {
    name: String,
    person: String,
    activity: String,
    ranges: Vec<(u64, u64)>,
}

fn parse_line(line: &str) -> Option<Sequence> {
    let mut tokens = line.split_whitespace();
    let name = tokens.next()?;
    if tokens.next()? != FRAMES_TOKEN {
        return None;
    }

    let mut fields = name.split('_');
    let person = fields.next()?.strip_prefix("person")?.parse::<u32>().ok()?;
    let activity = fields.next()?;

    let ranges: Vec<(u64, u64)> = tokens
        .flat_map(|t| t.split(','))
        .filter_map(parse_range)
        .collect();
    if ranges.is_empty() {
        return None;
    }

    Some(Sequence {
        name: name.to_string(),
        person: person.to_string(),
        activity: activity.to_string(),
        ranges,
    })
}

fn parse_range(token: &str) -> Option<(u64, u64)> {
    let (a, b) = token.trim().split_once('-')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

/// Person number encoded in a KTH source id (`person07_...` → 7).
pub fn person_of(source_id: &str) -> Option<u32> {
    source_id
        .strip_prefix("person")?
        .split('_')
        .next()?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_line() {
        let seq = parse_line("person01_boxing_d1\t\tframes\t1-95, 96-185, 186-245").unwrap();
        assert_eq!(seq.person, "1");
        assert_eq!(seq.activity, "boxing");
        assert_eq!(seq.ranges, vec![(1, 95), (96, 185), (186, 245)]);

        assert!(parse_line("Training: person11, person12").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn test_person_of() {
        assert_eq!(person_of("person07_walking_d3_uncomp"), Some(7));
        assert_eq!(person_of("subject1_cam1"), None);
    }

    #[test]
    fn test_adapt() {
        let dir = TempDir::new().unwrap();
        let seq = dir.path().join("00sequences.txt");
        fs::write(
            &seq,
            "Sequences\n\nperson01_boxing_d1\t\tframes\t1-95, 96-185\nperson02_walking_d2\t\tframes\t5-40\n",
        )
        .unwrap();

        let mut settings = DatasetSettings::new(tubelet_models::DatasetKind::Kth, dir.path(), DataFormat::Video, false, 25.0);
        settings.sequence_file = Some(seq);

        let records = adapt(&settings).unwrap();
        let boxing = &records["person01_boxing_d1_uncomp.avi"];
        assert_eq!(boxing.len(), 2);
        assert_eq!(boxing[0].start_frame, 1);
        assert_eq!(boxing[0].end_frame, Some(96));
        assert_eq!(boxing[0].actor_id.as_deref(), Some("1"));
        assert_eq!(boxing[0].frame_source, dir.path().join("person01_boxing_d1_uncomp.avi"));

        settings.allow_list = Some(["walking".to_string()].into_iter().collect());
        let records = adapt(&settings).unwrap();
        assert_eq!(records.keys().collect::<Vec<_>>(), vec!["person02_walking_d2_uncomp.avi"]);
    }

    #[test]
    fn test_missing_sequence_file_key() {
        let settings = DatasetSettings::new(tubelet_models::DatasetKind::Kth, "/data", DataFormat::Video, false, 25.0);
        assert!(check_config(&settings).unwrap_err().is_config());
    }
}
