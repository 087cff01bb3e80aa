//! Tubelet dataset generator binary.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;

use tubelet_generator::{
    filter_classes, init_tracing, load_config, relabel_manifests, split_output, ClassFilter, LabelMapper, Pipeline,
    FILTERED_SUFFIX,
};

/// Phase of the run to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Phase {
    /// Generate tubelets for the selected datasets
    Generate,
    /// Write train/test manifests for the tubelets on disk
    Split,
    /// Generate, then split
    All,
    /// Map manifests onto the unified label set
    Relabel,
    /// Drop under-represented classes from the manifests
    Stats,
}

#[derive(Debug, Parser)]
#[command(name = "tubelet-generator", version, about = "Build an action tubelet dataset from annotated videos")]
struct Cli {
    /// Configuration document
    #[arg(short, long, default_value = "generator_config.json")]
    config: PathBuf,

    #[arg(short, long, value_enum, default_value_t = Phase::All)]
    phase: Phase,

    /// Classes kept by the stats phase instead of the sample threshold
    #[arg(long, value_delimiter = ',')]
    include: Vec<String>,

    /// Suffix of the files written by the stats phase
    #[arg(long, default_value = FILTERED_SUFFIX)]
    suffix: String,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    info!(config = %cli.config.display(), phase = ?cli.phase, "Starting tubelet-generator");

    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    let output_dir = config.global_settings.output_dir.clone();

    match cli.phase {
        Phase::Generate => {
            let summaries = Pipeline::new(config)
                .context("invalid configuration")?
                .generate()
                .context("generation failed")?;
            for (dataset, s) in &summaries {
                info!(
                    dataset = %dataset,
                    videos = s.videos,
                    failed_videos = s.failed_videos,
                    tubelets = s.tubelets,
                    frames_written = s.frames_written,
                    frames_skipped = s.frames_skipped,
                    "Dataset summary"
                );
            }
        }
        Phase::Split => {
            split_output(&config).context("split failed")?;
        }
        Phase::All => {
            Pipeline::new(config)
                .context("invalid configuration")?
                .run_all()
                .context("run failed")?;
        }
        Phase::Relabel => {
            let mapper = LabelMapper::from_settings(&config.global_settings);
            relabel_manifests(&output_dir, &mapper).context("relabel failed")?;
        }
        Phase::Stats => {
            let filter = ClassFilter::new(config.global_settings.min_samples_per_class)
                .with_include(cli.include)
                .with_suffix(cli.suffix);
            let stats = filter_classes(&output_dir, &filter).context("statistics failed")?;
            info!(classes = stats.len(), "Class filtering finished");
        }
    }

    info!("tubelet-generator finished");
    Ok(())
}
