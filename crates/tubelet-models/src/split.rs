//! Train/test partition labels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Partition a tubelet is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    /// Manifest file name for this partition.
    pub fn manifest_file(&self) -> &'static str {
        match self {
            Split::Train => "train.txt",
            Split::Test => "test.txt",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => f.write_str("train"),
            Split::Test => f.write_str("test"),
        }
    }
}

/// Class list file written next to the manifests.
pub const CLASS_LIST_FILE: &str = "class_list.txt";
