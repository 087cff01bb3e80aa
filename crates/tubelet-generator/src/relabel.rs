//! Remapping dataset-native activities onto one shared taxonomy.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{info, warn};
use tubelet_models::{normalize_component, GlobalSettings, Split, CLASS_LIST_FILE};

use crate::error::GeneratorResult;
use crate::manifest::{read_manifest, write_lines, write_manifest, ManifestEntry};

/// Prefix of the remapped manifest files.
pub const RELABEL_PREFIX: &str = "tubelet_";

/// Unified labels, in class index order.
pub const TUBELET_LABELS: [&str; 7] = [
    "WALKING",
    "RUNNING",
    "SITTING",
    "STANDING",
    "GESTURING",
    "CARRYING",
    "USING_PHONE",
];

const DEFAULT_LABEL_MAP: &[(&str, &str)] = &[
    // KTH
    ("walking", "WALKING"),
    ("running", "RUNNING"),
    ("jogging", "RUNNING"),
    ("handwaving", "GESTURING"),
    // VIRAT
    ("activity_carrying", "CARRYING"),
    ("activity_sitting", "SITTING"),
    ("activity_gesturing", "GESTURING"),
    ("activity_standing", "STANDING"),
    ("activity_running", "RUNNING"),
    ("activity_walking", "WALKING"),
    ("specialized_talking_phone", "USING_PHONE"),
    ("specialized_texting_phone", "USING_PHONE"),
    // JRDBACT
    ("greeting_gestures", "GESTURING"),
    ("standing", "STANDING"),
    ("holding_sth", "CARRYING"),
    ("sitting", "SITTING"),
    ("talking_on_the_phone", "USING_PHONE"),
    // OKUTAMA
    ("Calling", "USING_PHONE"),
    ("Running", "RUNNING"),
    ("Sitting", "SITTING"),
    ("Walking", "WALKING"),
    ("Standing", "STANDING"),
    ("Carrying", "CARRYING"),
    // UCFARG
    ("carrying", "CARRYING"),
    ("waving", "GESTURING"),
    // MMACT
    ("talking_on_phone", "USING_PHONE"),
    ("using_phone", "USING_PHONE"),
    ("waving_hand", "GESTURING"),
    // MCAD
    ("CellToEar", "USING_PHONE"),
    ("PersonRun", "RUNNING"),
    ("SitDown", "SITTING"),
    ("StandUp", "STANDING"),
    ("TakePicture", "USING_PHONE"),
    ("UseCellPhone", "USING_PHONE"),
    ("Walk", "WALKING"),
    ("Wave", "GESTURING"),
];

/// Native label → unified label lookup.
#[derive(Debug, Clone)]
pub struct LabelMapper {
    map: BTreeMap<String, String>,
    labels: Vec<String>,
}

impl Default for LabelMapper {
    fn default() -> Self {
        Self {
            map: DEFAULT_LABEL_MAP
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            labels: TUBELET_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LabelMapper {
    /// Built-in tables, each replaced by its configured counterpart.
    pub fn from_settings(global: &GlobalSettings) -> Self {
        let mut mapper = Self::default();
        if let Some(map) = &global.label_map {
            mapper.map = map
                .iter()
                .map(|(k, v)| (normalize_component(k), v.clone()))
                .collect();
        }
        if let Some(labels) = &global.tubelet_labels {
            mapper.labels = labels.clone();
        }
        mapper
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Class index of a native activity, `None` when it has no mapping.
    pub fn class_of(&self, activity: &str) -> Option<usize> {
        let unified = self.map.get(activity)?;
        self.labels.iter().position(|l| l == unified)
    }
}

/// Rewrite `train.txt` and `test.txt` under `dir` with unified class
/// indices. Returns the number of lines kept per split.
pub fn relabel_manifests(dir: &Path, mapper: &LabelMapper) -> GeneratorResult<BTreeMap<Split, usize>> {
    let mut kept = BTreeMap::new();
    for split in [Split::Train, Split::Test] {
        let source = dir.join(split.manifest_file());
        let entries = read_manifest(&source)?;

        let mut remapped = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.activity().and_then(|a| mapper.class_of(a)) {
                Some(class_index) => remapped.push(ManifestEntry { class_index, ..entry }),
                None => warn!(tubelet = %entry.name, "No unified label for activity, dropped"),
            }
        }

        let target = dir.join(format!("{}{}", RELABEL_PREFIX, split.manifest_file()));
        write_manifest(&target, &remapped)?;
        info!(split = %split, lines = remapped.len(), path = %target.display(), "Relabelled manifest written");
        kept.insert(split, remapped.len());
    }

    write_lines(&dir.join(format!("{}{}", RELABEL_PREFIX, CLASS_LIST_FILE)), mapper.labels())?;
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tubelet_models::GeneratorConfig;

    #[test]
    fn test_default_mapping() {
        let mapper = LabelMapper::default();
        assert_eq!(mapper.class_of("jogging"), Some(1));
        assert_eq!(mapper.class_of("Calling"), Some(6));
        assert_eq!(mapper.class_of("boxing"), None);
    }

    #[test]
    fn test_configured_tables_replace_defaults() {
        let config = GeneratorConfig::from_json(
            r#"{"global_settings": {"output_dir": "out", "max_duration": 1.0, "min_duration": 0.0, "bbox_variation": "original",
                "label_map": {"pick up": "HANDLING"}, "tubelet_labels": ["OTHER", "HANDLING"]}}"#,
        )
        .unwrap();
        let mapper = LabelMapper::from_settings(&config.global_settings);
        assert_eq!(mapper.class_of("pick_up"), Some(1));
        assert_eq!(mapper.class_of("walking"), None);
    }

    #[test]
    fn test_relabel_manifests() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("train.txt"),
            "KTH-person11_jogging_d1_uncomp-jogging-1_51-t11_p0 50 2\n\
             KTH-person11_boxing_d1_uncomp-boxing-1_51-t11_p0 50 0\n",
        )
        .unwrap();
        fs::write(dir.path().join("test.txt"), "UCFARG-a_b_c-waving-0_40-p0 40 5\n").unwrap();

        let kept = relabel_manifests(dir.path(), &LabelMapper::default()).unwrap();
        assert_eq!(kept[&Split::Train], 1);
        assert_eq!(kept[&Split::Test], 1);

        let train = fs::read_to_string(dir.path().join("tubelet_train.txt")).unwrap();
        assert_eq!(train, "KTH-person11_jogging_d1_uncomp-jogging-1_51-t11_p0 50 1\n");
        let test = fs::read_to_string(dir.path().join("tubelet_test.txt")).unwrap();
        assert_eq!(test, "UCFARG-a_b_c-waving-0_40-p0 40 4\n");
        let classes = fs::read_to_string(dir.path().join("tubelet_class_list.txt")).unwrap();
        assert_eq!(classes.lines().count(), 7);
    }
}
