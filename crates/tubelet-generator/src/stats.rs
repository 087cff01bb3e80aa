//! Per-class sample counts and filtering of under-represented classes.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};
use tubelet_models::{Split, CLASS_LIST_FILE};

use crate::error::GeneratorResult;
use crate::manifest::{read_lines, read_manifest, write_lines, write_manifest, ManifestEntry};

/// Default suffix of the filtered outputs (`train_filtered.txt`, ...).
pub const FILTERED_SUFFIX: &str = "filtered";

/// Which classes survive filtering and where the result is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassFilter {
    pub min_samples: usize,
    /// Explicit allow-list. When non-empty it replaces the `min_samples`
    /// threshold.
    pub include: Vec<String>,
    pub suffix: String,
}

impl ClassFilter {
    pub fn new(min_samples: usize) -> Self {
        Self {
            min_samples,
            include: Vec::new(),
            suffix: FILTERED_SUFFIX.to_string(),
        }
    }

    pub fn with_include(mut self, include: Vec<String>) -> Self {
        self.include = include;
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    fn keeps(&self, stats: &ClassStats) -> bool {
        if self.include.is_empty() {
            stats.train >= self.min_samples && stats.test >= self.min_samples
        } else {
            self.include.contains(&stats.activity)
        }
    }
}

/// Sample counts of one surviving class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassStats {
    pub activity: String,
    pub train: usize,
    pub test: usize,
}

impl ClassStats {
    pub fn total(&self) -> usize {
        self.train + self.test
    }
}

fn filtered_name(file: &str, suffix: &str) -> String {
    match file.rsplit_once('.') {
        Some((stem, ext)) => format!("{}_{}.{}", stem, suffix, ext),
        None => format!("{}_{}", file, suffix),
    }
}

/// Keep the classes selected by `filter` and write reindexed
/// `*_{suffix}` manifests under `dir`.
///
/// The filtered manifests hold the last frame index (`frame_count - 1`)
/// in their second column.
pub fn filter_classes(dir: &Path, filter: &ClassFilter) -> GeneratorResult<Vec<ClassStats>> {
    let train = read_manifest(&dir.join(Split::Train.manifest_file()))?;
    let test = read_manifest(&dir.join(Split::Test.manifest_file()))?;
    let classes = read_lines(&dir.join(CLASS_LIST_FILE))?;
    info!(
        train = train.len(),
        test = test.len(),
        classes = classes.len(),
        include = ?filter.include,
        suffix = %filter.suffix,
        "Manifests loaded"
    );

    let count = |entries: &[ManifestEntry], class: &str| entries.iter().filter(|e| e.activity() == Some(class)).count();

    let mut kept = Vec::new();
    for class in &classes {
        let stats = ClassStats {
            activity: class.clone(),
            train: count(&train, class),
            test: count(&test, class),
        };
        if stats.train < filter.min_samples || stats.test < filter.min_samples {
            warn!(
                activity = %class,
                train = stats.train,
                test = stats.test,
                min_samples = filter.min_samples,
                "Too few samples"
            );
        }
        if filter.keeps(&stats) {
            kept.push(stats);
        } else {
            debug!(activity = %class, "Class removed");
        }
    }

    let new_index: BTreeMap<&str, usize> = kept
        .iter()
        .enumerate()
        .map(|(i, s)| (s.activity.as_str(), i))
        .collect();
    let reindex = |entries: Vec<ManifestEntry>| -> Vec<ManifestEntry> {
        entries
            .into_iter()
            .filter_map(|e| {
                let class = classes.get(e.class_index)?;
                let class_index = *new_index.get(class.as_str())?;
                Some(ManifestEntry {
                    frame_count: e.frame_count.saturating_sub(1),
                    class_index,
                    name: e.name,
                })
            })
            .collect()
    };

    for (split, entries) in [(Split::Train, train), (Split::Test, test)] {
        let filtered = reindex(entries);
        write_manifest(&dir.join(filtered_name(split.manifest_file(), &filter.suffix)), &filtered)?;
    }
    let names: Vec<String> = kept.iter().map(|s| s.activity.clone()).collect();
    write_lines(&dir.join(filtered_name(CLASS_LIST_FILE, &filter.suffix)), &names)?;

    for s in &kept {
        info!(activity = %s.activity, train = s.train, test = s.test, total = s.total(), "Class statistics");
    }
    Ok(kept)
}
