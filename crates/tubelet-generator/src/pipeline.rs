//! Run driver.
//!
//! Each selected dataset goes through adaptation, frame acquisition and
//! cropping. The split runs once every dataset has finished.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rayon::prelude::*;
use tracing::{info, warn};
use tubelet_datasets::{AdapterOptions, DatasetAdapter, SplitRule};
use tubelet_media::{detector_from_config, FfmpegRunner, PersonDetector};
use tubelet_models::{ActivityRecord, ConfigError, DataFormat, DatasetSettings, GeneratorConfig, VideoRecords};

use crate::acquisition::{acquire_video, AcquiredVideo};
use crate::config::worker_count;
use crate::context::DatasetContext;
use crate::error::{GeneratorError, GeneratorResult};
use crate::logging::DatasetLogger;
use crate::metrics;
use crate::splitter::{split_tubelets, SplitPlan, SplitReport};
use crate::tubelet::{crop_tubelet, plan_tubelets, CropSummary};

/// Counts for one generated dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub videos: usize,
    pub failed_videos: usize,
    pub tubelets: usize,
    pub failed_tubelets: usize,
    pub frames_written: usize,
    pub frames_skipped: usize,
}

pub struct Pipeline {
    config: GeneratorConfig,
    datasets: Vec<DatasetSettings>,
    pool: rayon::ThreadPool,
    runner: Option<FfmpegRunner>,
    detector: Option<Box<dyn PersonDetector>>,
}

impl Pipeline {
    /// Validate the configuration and prepare shared resources.
    ///
    /// Fails before any work when the configuration is invalid.
    pub fn new(config: GeneratorConfig) -> GeneratorResult<Self> {
        let datasets = config.validate()?;
        for settings in &datasets {
            DatasetAdapter::for_kind(settings.kind).check_config(settings)?;
        }

        let threads = worker_count(&config);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tubelet-worker-{}", i))
            .build()
            .map_err(|e| GeneratorError::Pool(e.to_string()))?;

        let detector = match datasets.iter().find(|d| !d.bbox_info) {
            Some(needs) => {
                let detector_config = config
                    .global_settings
                    .detector
                    .as_ref()
                    .ok_or_else(|| ConfigError::MissingDetector(needs.kind.to_string()))?;
                let detector = detector_from_config(detector_config)?;
                info!(detector = detector.name(), "Person detector ready");
                Some(detector)
            }
            None => None,
        };

        let runner = if datasets.iter().any(|d| d.data_format == DataFormat::Video) {
            match FfmpegRunner::new() {
                Ok(runner) => Some(runner),
                Err(e) => {
                    warn!(error = %e, "ffmpeg unavailable, video datasets will produce no frames");
                    None
                }
            }
        } else {
            None
        };

        info!(
            datasets = datasets.len(),
            workers = threads,
            "Pipeline initialized"
        );

        Ok(Self {
            config,
            datasets,
            pool,
            runner,
            detector,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate the tubelets of every selected dataset.
    ///
    /// A dataset that fails for a non-configuration reason is logged and
    /// skipped.
    pub fn generate(&self) -> GeneratorResult<BTreeMap<String, DatasetSummary>> {
        let global = &self.config.global_settings;
        fs::create_dir_all(&global.output_dir).map_err(|e| GeneratorError::io(&global.output_dir, e))?;

        let mut summaries = BTreeMap::new();
        for settings in &self.datasets {
            let ctx = DatasetContext::new(settings.clone(), global);
            let logger = DatasetLogger::new(ctx.kind(), "generate");
            let span = logger.create_span();
            let _guard = span.enter();

            logger.log_start(&format!(
                "max_frames={} min_frames={} policy={}",
                ctx.max_frames, ctx.min_frames, ctx.policy
            ));
            match self.generate_dataset(&ctx, &logger) {
                Ok(summary) => {
                    logger.log_completion(&format!(
                        "{} tubelets, {} frames written, {} skipped",
                        summary.tubelets, summary.frames_written, summary.frames_skipped
                    ));
                    summaries.insert(logger.dataset().to_string(), summary);
                }
                Err(e) if e.is_fatal() => {
                    logger.log_error(&e.to_string());
                    return Err(e);
                }
                Err(e) => logger.log_error(&format!("dataset skipped: {}", e)),
            }
        }
        Ok(summaries)
    }

    fn generate_dataset(&self, ctx: &DatasetContext, logger: &DatasetLogger) -> GeneratorResult<DatasetSummary> {
        let global = &self.config.global_settings;
        let options = AdapterOptions {
            merge_gap: global.merge_gap,
            min_box_size: global.min_box_size,
        };
        let records = DatasetAdapter::for_kind(ctx.kind()).adapt(&ctx.settings, &options)?;
        let mut summary = DatasetSummary {
            videos: records.len(),
            ..DatasetSummary::default()
        };

        let videos = self.acquire_all(ctx, records);
        summary.failed_videos = summary.videos - videos.len();
        logger.log_progress(&format!(
            "{} of {} videos acquired",
            videos.len(),
            summary.videos
        ));

        if let Err(e) = write_snapshot(&global.snapshot_dir, ctx, &videos) {
            logger.log_warning(&format!("records snapshot not written: {}", e));
        }

        let jobs = plan_tubelets(ctx.kind(), &videos, ctx.max_frames);
        logger.log_progress(&format!("{} tubelet jobs planned", jobs.len()));

        let results: Vec<GeneratorResult<CropSummary>> = self.pool.install(|| {
            jobs.par_iter()
                .map(|job| crop_tubelet(job, ctx.policy, &ctx.output_dir))
                .collect()
        });

        for (job, result) in jobs.iter().zip(results) {
            match result {
                Ok(crop) => {
                    if crop.written > 0 {
                        summary.tubelets += 1;
                    }
                    summary.frames_written += crop.written;
                    summary.frames_skipped += crop.skipped;
                }
                Err(e) => {
                    summary.failed_tubelets += 1;
                    logger.log_warning(&format!("tubelet {} failed: {}", job.name, e));
                }
            }
        }
        Ok(summary)
    }

    fn acquire_all(&self, ctx: &DatasetContext, records: VideoRecords) -> Vec<AcquiredVideo> {
        let work: Vec<(String, Vec<ActivityRecord>)> = records.into_iter().collect();
        let runner = self.runner.as_ref();
        let detector = self.detector.as_deref();
        let dataset = ctx.kind().as_str();

        self.pool.install(|| {
            work.into_par_iter()
                .filter_map(|(key, recs)| {
                    let span = tracing::debug_span!("video", dataset, video = %key);
                    let _guard = span.enter();
                    match acquire_video(ctx, &key, recs, runner, detector) {
                        Ok(video) => {
                            metrics::record_video_acquired(dataset);
                            Some(video)
                        }
                        Err(e) => {
                            metrics::record_video_failed(dataset);
                            warn!(dataset, video = %key, error = %e, "Video skipped");
                            None
                        }
                    }
                })
                .collect()
        })
    }

    /// Split every tubelet under the output directory.
    pub fn split(&self) -> GeneratorResult<SplitReport> {
        split_output(&self.config)
    }

    /// Generate every dataset, then split.
    pub fn run_all(&self) -> GeneratorResult<SplitReport> {
        let summaries = self.generate()?;
        info!(datasets = summaries.len(), "Generation finished, splitting");
        self.split()
    }
}

/// Split phase over the configured output directory.
///
/// Every configured dataset takes part, selected for generation or not,
/// so tubelets of earlier runs are kept in the manifests.
pub fn split_output(config: &GeneratorConfig) -> GeneratorResult<SplitReport> {
    let global = &config.global_settings;
    let mut plans = BTreeMap::new();
    for (kind, settings) in config.all_dataset_settings()? {
        match SplitRule::for_dataset(&settings, global.split_seed, global.test_fraction) {
            Ok(rule) => {
                plans.insert(
                    kind,
                    SplitPlan {
                        min_frames: settings.frames_for(global.min_duration),
                        rule,
                    },
                );
            }
            Err(e) if e.is_config() => return Err(e.into()),
            Err(e) => warn!(dataset = %kind, error = %e, "No split rule, dataset left out"),
        }
    }

    tracing::info_span!("split", datasets = plans.len()).in_scope(|| split_tubelets(&global.output_dir, &plans))
}

fn write_snapshot(snapshot_dir: &Path, ctx: &DatasetContext, videos: &[AcquiredVideo]) -> GeneratorResult<()> {
    fs::create_dir_all(snapshot_dir).map_err(|e| GeneratorError::io(snapshot_dir, e))?;
    let records: VideoRecords = videos
        .iter()
        .map(|v| (v.video_key.clone(), v.records.clone()))
        .collect();
    let path = snapshot_dir.join(format!("{}_records.json", ctx.kind()));
    let json = serde_json::to_string_pretty(&records)?;
    fs::write(&path, json).map_err(|e| GeneratorError::io(&path, e))?;
    info!(dataset = %ctx.kind(), path = %path.display(), "Records snapshot written");
    Ok(())
}
