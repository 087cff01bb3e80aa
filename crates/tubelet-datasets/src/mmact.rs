//! MMAct: `src_dir/{subject}/{cam}/{scene}/{session}/{clip}`.
//!
//! Every clip is one activity, named by the clip's stem.

use tubelet_models::{ActivityRecord, DatasetSettings, VideoRecords};

use crate::common::{clip_sources, file_stem, push_record, relative_key, require_dir, sub_dirs};
use crate::error::AdapterResult;

/// Subjects 1 to 16 form the cross-subject training set.
pub const TRAIN_SUBJECTS: std::ops::RangeInclusive<u32> = 1..=16;

pub fn adapt(settings: &DatasetSettings) -> AdapterResult<VideoRecords> {
    require_dir(&settings.src_dir)?;

    let mut records = VideoRecords::new();
    for subject in sub_dirs(&settings.src_dir)? {
        for cam in sub_dirs(&subject)? {
            for scene in sub_dirs(&cam)? {
                for session in sub_dirs(&scene)? {
                    for clip in clip_sources(&session, settings.data_format)? {
                        let activity = file_stem(&clip);
                        if !settings.allows(&activity) {
                            continue;
                        }
                        let key = relative_key(&settings.src_dir, &clip);
                        push_record(
                            &mut records,
                            ActivityRecord::whole_clip(key, activity, settings.first_frame_index, clip),
                        );
                    }
                }
            }
        }
    }
    Ok(records)
}

/// Subject number of an MMAct source id (`subject7_cam1_...` → 7).
pub fn subject_of(source_id: &str) -> Option<u32> {
    source_id
        .split('_')
        .next()?
        .strip_prefix("subject")?
        .parse()
        .ok()
}
