//! MCAD: `src_dir/{id}/{clip}` with the action code `A01`..`A18` in the
//! second-to-last `_` field of the clip name.

use tracing::debug;
use tubelet_models::{ActivityRecord, DatasetSettings, VideoRecords};

use crate::common::{clip_sources, file_name, file_stem, push_record, relative_key, require_dir, sub_dirs};
use crate::error::AdapterResult;

const ACTION_CODES: [(&str, &str); 18] = [
    ("A01", "Point"),
    ("A02", "Wave"),
    ("A03", "Jump"),
    ("A04", "Crouch"),
    ("A05", "Sneeze"),
    ("A06", "SitDown"),
    ("A07", "StandUp"),
    ("A08", "Walk"),
    ("A09", "PersonRun"),
    ("A10", "CellToEar"),
    ("A11", "UseCellPhone"),
    ("A12", "DrinkingWater"),
    ("A13", "TakePicture"),
    ("A14", "ObjectGet"),
    ("A15", "ObjectPut"),
    ("A16", "ObjectLeft"),
    ("A17", "ObjectCarry"),
    ("A18", "ObjectThrow"),
];

pub fn action_for_code(code: &str) -> Option<&'static str> {
    ACTION_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, action)| *action)
}

/// Activity encoded in a clip name such as `cam01_P01_A08_R1.avi`.
fn activity_of(clip_name: &str) -> Option<&'static str> {
    let fields: Vec<&str> = clip_name.split('_').collect();
    let code = fields.len().checked_sub(2).map(|i| fields[i])?;
    action_for_code(code)
}

pub fn adapt(settings: &DatasetSettings) -> AdapterResult<VideoRecords> {
    require_dir(&settings.src_dir)?;

    let mut records = VideoRecords::new();
    for id_dir in sub_dirs(&settings.src_dir)? {
        for clip in clip_sources(&id_dir, settings.data_format)? {
            let Some(activity) = activity_of(&file_stem(&clip)) else {
                debug!(clip = %file_name(&clip), "No known action code, skipping");
                continue;
            };
            if !settings.allows(activity) {
                continue;
            }
            let key = relative_key(&settings.src_dir, &clip);
            push_record(
                &mut records,
                ActivityRecord::whole_clip(key, activity, settings.first_frame_index, clip),
            );
        }
    }
    Ok(records)
}
