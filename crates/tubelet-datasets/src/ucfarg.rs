//! UCF-ARG: `src_dir/{view}/{class}/{clip}`, one whole-clip record per clip.

use tubelet_models::{ActivityRecord, DatasetSettings, VideoRecords};

use crate::common::{clip_sources, file_name, push_record, relative_key, require_dir, sub_dirs};
use crate::error::AdapterResult;

pub fn adapt(settings: &DatasetSettings) -> AdapterResult<VideoRecords> {
    require_dir(&settings.src_dir)?;

    let mut records = VideoRecords::new();
    for view_dir in sub_dirs(&settings.src_dir)? {
        for class_dir in sub_dirs(&view_dir)? {
            let activity = file_name(&class_dir);
            if !settings.allows(&activity) {
                continue;
            }
            for clip in clip_sources(&class_dir, settings.data_format)? {
                let key = relative_key(&settings.src_dir, &clip);
                push_record(
                    &mut records,
                    ActivityRecord::whole_clip(key, &activity, settings.first_frame_index, clip),
                );
            }
        }
    }
    Ok(records)
}
