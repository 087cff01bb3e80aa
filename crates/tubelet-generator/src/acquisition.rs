//! Frame acquisition for one video.
//!
//! Guarantees the frames of a video exist on disk, learns how many there
//! are, and attaches detector boxes when the dataset ships none.

use tracing::{debug, info, warn};
use tubelet_media::{decode_video, index_detections, DecodeOptions, FfmpegRunner, FrameDirectory, MediaError, PersonDetector};
use tubelet_models::{source_id_for, ActivityRecord, DataFormat};

use crate::context::DatasetContext;
use crate::error::GeneratorResult;

/// A video whose frames are on disk and whose records are bounded to them.
#[derive(Debug, Clone)]
pub struct AcquiredVideo {
    pub video_key: String,
    pub frames: FrameDirectory,
    /// Every record has `end_frame` set and boxes inside its interval.
    pub records: Vec<ActivityRecord>,
}

/// Make the frames of `video_key` available and bound its records.
///
/// Video datasets are decoded under `{tmp_dir}/{DATASET}/{source_id}`;
/// frame datasets are read in place. Records that end up empty after
/// truncation to the last frame are dropped.
pub fn acquire_video(
    ctx: &DatasetContext,
    video_key: &str,
    records: Vec<ActivityRecord>,
    runner: Option<&FfmpegRunner>,
    detector: Option<&dyn PersonDetector>,
) -> GeneratorResult<AcquiredVideo> {
    let Some(source) = records.first().map(|r| r.frame_source.clone()) else {
        return Err(MediaError::internal(format!("video {} has no records", video_key)).into());
    };
    let naming = ctx.settings.frame_naming.clone();

    let (frames, last_frame) = match ctx.settings.data_format {
        DataFormat::Video => {
            let runner = runner.ok_or(MediaError::FfmpegNotFound)?;
            let dest = ctx.frames_root.join(source_id_for(video_key));
            let options = DecodeOptions {
                naming,
                first_index: ctx.settings.first_frame_index,
                rate: ctx.rate,
            };
            decode_video(runner, &source, &dest, &options)?
        }
        DataFormat::Frames => {
            let frames = FrameDirectory::new(&source, naming);
            let last = frames.last_index()?.ok_or_else(|| MediaError::NoFrames(source.clone()))?;
            (frames, last)
        }
    };

    let mut bounded = Vec::with_capacity(records.len());
    for mut record in records {
        match record.bounded_range(last_frame) {
            Some((start, end)) => {
                record.end_frame = Some(end);
                record.boxes.retain(|frame, _| (start..end).contains(frame));
                bounded.push(record);
            }
            None => debug!(
                video = %video_key,
                activity = %record.activity,
                start = record.start_frame,
                last_frame,
                "Record starts after the last frame, dropped"
            ),
        }
    }

    if !ctx.settings.bbox_info && !bounded.is_empty() {
        let detector = detector.ok_or_else(|| MediaError::detection_failed("no person detector available"))?;
        let mut detections = index_detections(detector.detect_dir(frames.path())?, frames.naming());
        let found = detections.len();
        detections.retain(|_, b| b.is_at_least(ctx.min_box_size));
        if detections.len() < found {
            debug!(
                video = %video_key,
                rejected = found - detections.len(),
                min_box_size = ctx.min_box_size,
                "Undersized detections discarded"
            );
        }
        if detections.is_empty() {
            warn!(video = %video_key, detector = detector.name(), "Detector found no person");
        }
        for record in &mut bounded {
            let end = record.end_frame.unwrap_or(record.start_frame);
            record.attach_boxes(detections.range(record.start_frame..end).map(|(f, b)| (*f, *b)));
        }
    }

    info!(
        dataset = %ctx.kind(),
        video = %video_key,
        last_frame,
        records = bounded.len(),
        "Frames acquired"
    );

    Ok(AcquiredVideo {
        video_key: video_key.to_string(),
        frames,
        records: bounded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeneratorError;
    use std::path::Path;
    use tempfile::TempDir;
    use tubelet_media::{Detections, MediaResult};
    use tubelet_models::{BoundingBox, DatasetKind, DatasetSettings, GeneratorConfig};

    struct FixedDetector(Detections);

    impl PersonDetector for FixedDetector {
        fn name(&self) -> &str {
            "fixed"
        }

        fn detect_dir(&self, _dir: &Path) -> MediaResult<Detections> {
            Ok(self.0.clone())
        }
    }

    fn context(kind: DatasetKind, bbox_info: bool) -> DatasetContext {
        let config = GeneratorConfig::from_json(
            r#"{"global_settings": {"output_dir": "out", "max_duration": 1.0, "min_duration": 0.0, "bbox_variation": "original"}}"#,
        )
        .unwrap();
        let settings = DatasetSettings::new(kind, "/unused", DataFormat::Frames, bbox_info, 10.0);
        DatasetContext::new(settings, &config.global_settings)
    }

    fn frame_dir(count: u64) -> TempDir {
        let dir = TempDir::new().unwrap();
        for i in 1..=count {
            std::fs::write(dir.path().join(format!("img_{:05}.jpg", i)), b"x").unwrap();
        }
        dir
    }

    #[test]
    fn test_whole_clip_bound_to_last_frame() {
        let dir = frame_dir(12);
        let ctx = context(DatasetKind::Ucfarg, true);
        let records = vec![ActivityRecord::whole_clip("v/clip.avi", "waving", 1, dir.path())];

        let acquired = acquire_video(&ctx, "v/clip.avi", records, None, None).unwrap();
        assert_eq!(acquired.records.len(), 1);
        assert_eq!(acquired.records[0].start_frame, 1);
        assert_eq!(acquired.records[0].end_frame, Some(13));
    }

    #[test]
    fn test_records_truncated_and_dropped() {
        let dir = frame_dir(10);
        let ctx = context(DatasetKind::Okutama, true);
        let mut long = ActivityRecord::new("v", "Walking", 5, 40, dir.path());
        long.boxes.insert(8, BoundingBox::new(0.0, 0.0, 20.0, 20.0));
        long.boxes.insert(30, BoundingBox::new(0.0, 0.0, 20.0, 20.0));
        let late = ActivityRecord::new("v", "Sitting", 20, 30, dir.path());

        let acquired = acquire_video(&ctx, "v", vec![long, late], None, None).unwrap();
        assert_eq!(acquired.records.len(), 1);
        assert_eq!(acquired.records[0].end_frame, Some(11));
        assert_eq!(acquired.records[0].boxes.keys().copied().collect::<Vec<_>>(), vec![8]);
    }

    #[test]
    fn test_detector_boxes_sliced_per_record() {
        let dir = frame_dir(6);
        let ctx = context(DatasetKind::Kth, false);
        let b = BoundingBox::new(1.0, 1.0, 30.0, 30.0);
        let detections: Detections = (1..=6).map(|i| (format!("img_{:05}", i), b)).collect();
        let detector = FixedDetector(detections);

        let records = vec![
            ActivityRecord::new("p.avi", "walking", 1, 3, dir.path()),
            ActivityRecord::new("p.avi", "walking", 4, 6, dir.path()),
        ];
        let acquired = acquire_video(&ctx, "p.avi", records, None, Some(&detector)).unwrap();
        let keys: Vec<Vec<u64>> = acquired
            .records
            .iter()
            .map(|r| r.boxes.keys().copied().collect())
            .collect();
        assert_eq!(keys, vec![vec![1, 2], vec![4, 5]]);
    }

    #[test]
    fn test_undersized_detections_leave_frame_without_box() {
        let dir = frame_dir(3);
        let ctx = context(DatasetKind::Ucfarg, false);
        let detections: Detections = [
            ("img_00001".to_string(), BoundingBox::new(5.0, 5.0, 40.0, 40.0)),
            ("img_00002".to_string(), BoundingBox::new(5.0, 5.0, 7.0, 7.0)),
            ("img_00003".to_string(), BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
        ]
        .into_iter()
        .collect();
        let detector = FixedDetector(detections);

        let records = vec![ActivityRecord::new("g/w/c", "waving", 1, 4, dir.path())];
        let acquired = acquire_video(&ctx, "g/w/c", records, None, Some(&detector)).unwrap();
        assert_eq!(acquired.records[0].boxes.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_video_without_runner_fails() {
        let mut ctx = context(DatasetKind::Kth, true);
        ctx.settings.data_format = DataFormat::Video;
        let records = vec![ActivityRecord::new("p.avi", "walking", 1, 3, "/data/p.avi")];
        let err = acquire_video(&ctx, "p.avi", records, None, None).unwrap_err();
        assert!(matches!(err, GeneratorError::Media(MediaError::FfmpegNotFound)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_empty_frame_directory() {
        let dir = TempDir::new().unwrap();
        let ctx = context(DatasetKind::JrdbAct, true);
        let records = vec![ActivityRecord::new("seq", "walking", 0, 3, dir.path())];
        assert!(matches!(
            acquire_video(&ctx, "seq", records, None, None),
            Err(GeneratorError::Media(MediaError::NoFrames(_)))
        ));
    }
}
