//! Global train/test split over every tubelet on disk.
//!
//! Runs after all datasets are generated. Reads only directory names and
//! frame counts, so it can also be run on its own over an existing output.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tubelet_datasets::SplitRule;
use tubelet_media::count_images;
use tubelet_models::{DatasetKind, Split, TubeletName, CLASS_LIST_FILE};

use crate::error::{GeneratorError, GeneratorResult};
use crate::manifest::{write_lines, write_manifest, ManifestEntry};

/// How the tubelets of one dataset are filtered and split.
#[derive(Debug, Clone)]
pub struct SplitPlan {
    pub min_frames: usize,
    pub rule: SplitRule,
}

/// Result of the split phase.
#[derive(Debug, Clone, Default)]
pub struct SplitReport {
    pub train: Vec<ManifestEntry>,
    pub test: Vec<ManifestEntry>,
    pub classes: Vec<String>,
    /// Tubelets below their dataset's minimum length
    pub too_short: usize,
}

#[derive(Debug)]
struct FoundTubelet {
    name: TubeletName,
    frame_count: usize,
}

/// Split every tubelet under `output_dir` and write `train.txt`,
/// `test.txt` and `class_list.txt` next to them.
pub fn split_tubelets(output_dir: &Path, plans: &BTreeMap<DatasetKind, SplitPlan>) -> GeneratorResult<SplitReport> {
    let found = scan_output(output_dir, plans)?;

    let mut per_dataset: BTreeMap<DatasetKind, Vec<TubeletName>> = BTreeMap::new();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut too_short = 0;
    for tubelet in found {
        let Some(plan) = plans.get(&tubelet.name.dataset) else {
            continue;
        };
        if tubelet.frame_count < plan.min_frames {
            too_short += 1;
            continue;
        }
        counts.insert(tubelet.name.to_string(), tubelet.frame_count);
        per_dataset.entry(tubelet.name.dataset).or_default().push(tubelet.name);
    }

    let mut assigned: Vec<(&TubeletName, Split)> = Vec::new();
    for (kind, names) in &per_dataset {
        let Some(plan) = plans.get(kind) else {
            continue;
        };
        assigned.extend(plan.rule.assign(names));
    }

    let classes: Vec<String> = assigned
        .iter()
        .map(|(t, _)| t.activity.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let class_index: BTreeMap<&str, usize> = classes.iter().enumerate().map(|(i, c)| (c.as_str(), i)).collect();

    let mut report = SplitReport {
        too_short,
        ..SplitReport::default()
    };
    for (tubelet, split) in assigned {
        let name = tubelet.to_string();
        let entry = ManifestEntry {
            frame_count: counts.get(&name).copied().unwrap_or(0),
            class_index: class_index.get(tubelet.activity.as_str()).copied().unwrap_or(0),
            name,
        };
        match split {
            Split::Train => report.train.push(entry),
            Split::Test => report.test.push(entry),
        }
    }
    report.train.sort_by(|a, b| a.name.cmp(&b.name));
    report.test.sort_by(|a, b| a.name.cmp(&b.name));
    report.classes = classes;

    write_manifest(&output_dir.join(Split::Train.manifest_file()), &report.train)?;
    write_manifest(&output_dir.join(Split::Test.manifest_file()), &report.test)?;
    write_lines(&output_dir.join(CLASS_LIST_FILE), &report.classes)?;

    info!(
        train = report.train.len(),
        test = report.test.len(),
        classes = report.classes.len(),
        too_short = report.too_short,
        "Split manifests written"
    );
    Ok(report)
}

fn scan_output(output_dir: &Path, plans: &BTreeMap<DatasetKind, SplitPlan>) -> GeneratorResult<Vec<FoundTubelet>> {
    if !output_dir.is_dir() {
        return Err(GeneratorError::MissingInput(output_dir.to_path_buf()));
    }
    let entries = fs::read_dir(output_dir).map_err(|e| GeneratorError::io(output_dir, e))?;

    let mut dirs: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| GeneratorError::io(output_dir, e))?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();

    let mut found = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let Some(file_name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let name = match file_name.parse::<TubeletName>() {
            Ok(name) => name,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Not a tubelet directory, skipped");
                continue;
            }
        };
        if !plans.contains_key(&name.dataset) {
            warn!(tubelet = %name, "Tubelet of a dataset missing from the configuration, skipped");
            continue;
        }
        let frame_count = count_images(&dir)?;
        found.push(FoundTubelet { name, frame_count });
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_tubelet(root: &Path, name: &TubeletName, frames: usize) {
        let dir = root.join(name.to_string());
        fs::create_dir_all(&dir).unwrap();
        for i in 0..frames {
            fs::write(dir.join(format!("img_{:05}.jpg", i)), b"x").unwrap();
        }
    }

    fn stratified(min_frames: usize) -> SplitPlan {
        SplitPlan {
            min_frames,
            rule: SplitRule::Stratified {
                seed: 42,
                test_fraction: 0.25,
            },
        }
    }

    #[test]
    fn test_short_tubelets_excluded() {
        let out = TempDir::new().unwrap();
        let short = TubeletName::new(DatasetKind::Ucfarg, "a/b/short.avi", "waving", None, 0, 3, 0);
        let long = TubeletName::new(DatasetKind::Ucfarg, "a/b/long.avi", "waving", None, 0, 8, 0);
        make_tubelet(out.path(), &short, 3);
        make_tubelet(out.path(), &long, 8);

        let plans = BTreeMap::from([(DatasetKind::Ucfarg, stratified(5))]);
        let report = split_tubelets(out.path(), &plans).unwrap();
        assert_eq!(report.too_short, 1);
        let listed: Vec<String> = report.train.iter().chain(&report.test).map(|e| e.name.clone()).collect();
        assert_eq!(listed, vec![long.to_string()]);
    }

    #[test]
    fn test_manifests_and_class_list() {
        let out = TempDir::new().unwrap();
        for (i, activity) in ["waving", "carrying", "waving", "waving"].iter().enumerate() {
            let name = TubeletName::new(DatasetKind::Ucfarg, &format!("v/c/clip{}.avi", i), activity, None, 0, 4, 0);
            make_tubelet(out.path(), &name, 4);
        }
        fs::create_dir_all(out.path().join("not-a-tubelet")).unwrap();
        let virat = TubeletName::new(DatasetKind::Virat, "VIRAT_S_1.mp4", "activity_walking", Some("1"), 0, 4, 0);
        make_tubelet(out.path(), &virat, 4);

        let plans = BTreeMap::from([(DatasetKind::Ucfarg, stratified(1))]);
        let report = split_tubelets(out.path(), &plans).unwrap();
        assert_eq!(report.classes, vec!["carrying".to_string(), "waving".to_string()]);
        assert_eq!(report.train.len() + report.test.len(), 4);
        assert_eq!(report.test.len(), 0);

        let class_list = fs::read_to_string(out.path().join(CLASS_LIST_FILE)).unwrap();
        assert_eq!(class_list, "carrying\nwaving\n");

        let train = fs::read_to_string(out.path().join("train.txt")).unwrap();
        let first = train.lines().next().unwrap();
        let clip0 = TubeletName::new(DatasetKind::Ucfarg, "v/c/clip0.avi", "waving", None, 0, 4, 0);
        assert_eq!(first, format!("{} 4 1", clip0));
        let mut sorted: Vec<&str> = train.lines().collect();
        sorted.sort();
        assert_eq!(sorted, train.lines().collect::<Vec<_>>());
    }

    #[test]
    fn test_deterministic_output() {
        let out = TempDir::new().unwrap();
        for i in 0..20 {
            let name = TubeletName::new(DatasetKind::Mcad, &format!("{}/clip_A01_{}.avi", i % 3, i), "Point", None, 0, 2, 0);
            make_tubelet(out.path(), &name, 2);
        }
        let plans = BTreeMap::from([(DatasetKind::Mcad, stratified(1))]);

        split_tubelets(out.path(), &plans).unwrap();
        let first_train = fs::read(out.path().join("train.txt")).unwrap();
        let first_test = fs::read(out.path().join("test.txt")).unwrap();
        split_tubelets(out.path(), &plans).unwrap();
        assert_eq!(fs::read(out.path().join("train.txt")).unwrap(), first_train);
        assert_eq!(fs::read(out.path().join("test.txt")).unwrap(), first_test);
        assert_eq!(String::from_utf8(first_test).unwrap().lines().count(), 5);
    }

    #[test]
    fn test_missing_output_dir() {
        let plans = BTreeMap::new();
        assert!(matches!(
            split_tubelets(Path::new("/nonexistent/out"), &plans),
            Err(GeneratorError::MissingInput(_))
        ));
    }
}
