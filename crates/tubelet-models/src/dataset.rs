//! Identity of the supported source datasets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::frame::FrameNaming;

/// The closed set of source datasets the generator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DatasetKind {
    Kth,
    Virat,
    #[serde(rename = "JRDBACT", alias = "JRDB-ACT", alias = "JRDB_ACT")]
    JrdbAct,
    Okutama,
    Ucfarg,
    Mmact,
    Mcad,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 7] = [
        DatasetKind::Kth,
        DatasetKind::Virat,
        DatasetKind::JrdbAct,
        DatasetKind::Okutama,
        DatasetKind::Ucfarg,
        DatasetKind::Mmact,
        DatasetKind::Mcad,
    ];

    /// Name used in configuration keys and as the tubelet name prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Kth => "KTH",
            DatasetKind::Virat => "VIRAT",
            DatasetKind::JrdbAct => "JRDBACT",
            DatasetKind::Okutama => "OKUTAMA",
            DatasetKind::Ucfarg => "UCFARG",
            DatasetKind::Mmact => "MMACT",
            DatasetKind::Mcad => "MCAD",
        }
    }

    /// Index of the first frame in the source annotations.
    ///
    /// Decoded frames are numbered from this value so that annotation
    /// frame numbers address frame files directly.
    pub fn default_first_frame_index(&self) -> u64 {
        match self {
            DatasetKind::Kth => 1,
            _ => 0,
        }
    }

    /// File naming of the frames the generator reads for this dataset.
    pub fn default_frame_naming(&self) -> FrameNaming {
        match self {
            // JRDB ships pre-extracted frames named `000123.jpg`
            DatasetKind::JrdbAct => FrameNaming::new("", 6, "jpg"),
            _ => FrameNaming::default(),
        }
    }

    /// Whether footage comes from a fixed camera.
    ///
    /// Okutama is recorded from drones, so a union box across a window
    /// does not track the actor.
    pub fn default_camera_is_static(&self) -> bool {
        !matches!(self, DatasetKind::Okutama)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        DatasetKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("unknown dataset '{}'", s))
    }
}
