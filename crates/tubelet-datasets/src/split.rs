//! Per-dataset train/test assignment.
//!
//! KTH, VIRAT and MMAct follow the partitions published with each dataset.
//! The remaining datasets have none and are split per class with a seeded
//! shuffle.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::warn;
use tubelet_models::{DatasetKind, DatasetSettings, Split, TubeletName};

use crate::error::AdapterResult;
use crate::{kth, mmact, virat};

/// KTH persons used for training (training and validation sets).
pub const KTH_TRAIN_PERSONS: [u32; 16] = [11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 23, 24, 25, 1, 4];
/// KTH persons held out for testing.
pub const KTH_TEST_PERSONS: [u32; 9] = [22, 2, 3, 5, 6, 7, 8, 9, 10];

/// How one dataset's tubelets are partitioned.
#[derive(Debug, Clone)]
pub enum SplitRule {
    KthPersons,
    ViratLists {
        train: BTreeSet<String>,
        test: BTreeSet<String>,
    },
    CrossSubject,
    Stratified {
        seed: u64,
        test_fraction: f64,
    },
}

impl SplitRule {
    /// Rule of a dataset. VIRAT reads its video lists from the annotation
    /// directory.
    pub fn for_dataset(settings: &DatasetSettings, seed: u64, test_fraction: f64) -> AdapterResult<Self> {
        Ok(match settings.kind {
            DatasetKind::Kth => SplitRule::KthPersons,
            DatasetKind::Virat => {
                let (train, test) = virat::split_lists(settings)?;
                SplitRule::ViratLists { train, test }
            }
            DatasetKind::Mmact => SplitRule::CrossSubject,
            DatasetKind::JrdbAct | DatasetKind::Okutama | DatasetKind::Ucfarg | DatasetKind::Mcad => {
                SplitRule::Stratified { seed, test_fraction }
            }
        })
    }

    /// Assign every tubelet of one dataset to a split.
    ///
    /// Tubelets the rule cannot place are logged and left out.
    pub fn assign<'a>(&self, tubelets: &'a [TubeletName]) -> Vec<(&'a TubeletName, Split)> {
        match self {
            SplitRule::Stratified { seed, test_fraction } => stratified(tubelets, *seed, *test_fraction),
            _ => tubelets
                .iter()
                .filter_map(|t| match self.native_split(t) {
                    Some(split) => Some((t, split)),
                    None => {
                        warn!(tubelet = %t, "No split rule matches tubelet, excluding it");
                        None
                    }
                })
                .collect(),
        }
    }

    fn native_split(&self, tubelet: &TubeletName) -> Option<Split> {
        match self {
            SplitRule::KthPersons => {
                let person = kth::person_of(&tubelet.source_id)?;
                if KTH_TRAIN_PERSONS.contains(&person) {
                    Some(Split::Train)
                } else if KTH_TEST_PERSONS.contains(&person) {
                    Some(Split::Test)
                } else {
                    None
                }
            }
            SplitRule::ViratLists { train, test } => {
                let label = tubelet.source_label();
                if train.contains(label) {
                    Some(Split::Train)
                } else if test.contains(label) {
                    Some(Split::Test)
                } else {
                    None
                }
            }
            SplitRule::CrossSubject => {
                let subject = mmact::subject_of(&tubelet.source_id)?;
                Some(if mmact::TRAIN_SUBJECTS.contains(&subject) {
                    Split::Train
                } else {
                    Split::Test
                })
            }
            SplitRule::Stratified { .. } => None,
        }
    }
}

/// Per class: sort by name, shuffle with `seed`, send the first
/// `floor(n * test_fraction)` to test and the rest to train.
fn stratified(tubelets: &[TubeletName], seed: u64, test_fraction: f64) -> Vec<(&TubeletName, Split)> {
    let mut by_class: BTreeMap<&str, Vec<&TubeletName>> = BTreeMap::new();
    for t in tubelets {
        by_class.entry(t.activity.as_str()).or_default().push(t);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut assigned = Vec::with_capacity(tubelets.len());
    for (_, mut members) in by_class {
        members.sort_by_cached_key(|t| t.to_string());
        members.shuffle(&mut rng);
        let n_test = (members.len() as f64 * test_fraction).floor() as usize;
        for (i, t) in members.into_iter().enumerate() {
            assigned.push((t, if i < n_test { Split::Test } else { Split::Train }));
        }
    }
    assigned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tubelet(kind: DatasetKind, source: &str, activity: &str, part: usize) -> TubeletName {
        TubeletName::new(kind, source, activity, None, 0, 10, part)
    }

    fn count(assigned: &[(&TubeletName, Split)], split: Split) -> usize {
        assigned.iter().filter(|(_, s)| *s == split).count()
    }

    #[test]
    fn test_stratified_ratio() {
        let tubelets: Vec<_> = (0..100).map(|i| tubelet(DatasetKind::Mcad, "01/clip", "Walk", i)).collect();
        let rule = SplitRule::Stratified { seed: 42, test_fraction: 0.25 };
        let assigned = rule.assign(&tubelets);
        assert_eq!(count(&assigned, Split::Test), 25);
        assert_eq!(count(&assigned, Split::Train), 75);
    }

    #[test]
    fn test_stratified_is_per_class_and_floors() {
        let mut tubelets: Vec<_> = (0..7).map(|i| tubelet(DatasetKind::Ucfarg, "v", "boxing", i)).collect();
        tubelets.extend((0..3).map(|i| tubelet(DatasetKind::Ucfarg, "v", "walking", i)));
        let assigned = SplitRule::Stratified { seed: 1, test_fraction: 0.25 }.assign(&tubelets);
        // floor(7 * 0.25) = 1, floor(3 * 0.25) = 0
        assert_eq!(count(&assigned, Split::Test), 1);
        assert_eq!(assigned.len(), 10);
    }

    #[test]
    fn test_stratified_is_deterministic_and_order_independent() {
        let tubelets: Vec<_> = (0..40).map(|i| tubelet(DatasetKind::Okutama, "1.1.1.mov", "Walking", i)).collect();
        let mut reversed = tubelets.clone();
        reversed.reverse();

        let rule = SplitRule::Stratified { seed: 7, test_fraction: 0.25 };
        let a: BTreeMap<String, Split> = rule.assign(&tubelets).into_iter().map(|(t, s)| (t.to_string(), s)).collect();
        let b: BTreeMap<String, Split> = rule.assign(&reversed).into_iter().map(|(t, s)| (t.to_string(), s)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_kth_persons() {
        let tubelets = vec![
            tubelet(DatasetKind::Kth, "person11_boxing_d1_uncomp.avi", "boxing", 0),
            tubelet(DatasetKind::Kth, "person01_boxing_d1_uncomp.avi", "boxing", 0),
            tubelet(DatasetKind::Kth, "person22_boxing_d1_uncomp.avi", "boxing", 0),
            tubelet(DatasetKind::Kth, "person05_boxing_d1_uncomp.avi", "boxing", 0),
            tubelet(DatasetKind::Kth, "person99_boxing_d1_uncomp.avi", "boxing", 0),
        ];
        let splits: Vec<Split> = SplitRule::KthPersons.assign(&tubelets).into_iter().map(|(_, s)| s).collect();
        assert_eq!(splits, vec![Split::Train, Split::Train, Split::Test, Split::Test]);
    }

    #[test]
    fn test_cross_subject() {
        let tubelets = vec![
            tubelet(DatasetKind::Mmact, "subject16/cam1/scene1/session1/walking.mp4", "walking", 0),
            tubelet(DatasetKind::Mmact, "subject17/cam1/scene1/session1/walking.mp4", "walking", 0),
        ];
        let splits: Vec<Split> = SplitRule::CrossSubject.assign(&tubelets).into_iter().map(|(_, s)| s).collect();
        assert_eq!(splits, vec![Split::Train, Split::Test]);
    }

    #[test]
    fn test_virat_lists() {
        let rule = SplitRule::ViratLists {
            train: ["VIRAT_S_000001".to_string()].into_iter().collect(),
            test: ["VIRAT_S_000002".to_string()].into_iter().collect(),
        };
        let tubelets = vec![
            tubelet(DatasetKind::Virat, "VIRAT_S_000002.mp4", "Talking", 0),
            tubelet(DatasetKind::Virat, "VIRAT_S_000001.mp4", "Talking", 0),
            tubelet(DatasetKind::Virat, "VIRAT_S_000003.mp4", "Talking", 0),
        ];
        let splits: Vec<Split> = rule.assign(&tubelets).into_iter().map(|(_, s)| s).collect();
        assert_eq!(splits, vec![Split::Test, Split::Train]);
    }
}
