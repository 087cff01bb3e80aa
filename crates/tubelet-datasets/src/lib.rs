//! Dataset adapters for the tubelet generator.
//!
//! Every supported dataset has its own annotation schema and directory
//! layout. An adapter turns one of them into canonical
//! [`ActivityRecord`](tubelet_models::ActivityRecord)s grouped by video, and
//! [`split::SplitRule`] encodes how the dataset's tubelets are partitioned.

pub mod common;
pub mod error;
pub mod jrdb;
pub mod kth;
pub mod mcad;
pub mod mmact;
pub mod okutama;
pub mod split;
pub mod ucfarg;
pub mod virat;

use tracing::info;
use tubelet_models::{DatasetKind, DatasetSettings, VideoRecords};

pub use common::{merge_observations, AdapterOptions, Interval, Observation};
pub use error::{AdapterError, AdapterResult};
pub use split::SplitRule;

/// The closed set of annotation adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetAdapter {
    Kth,
    Virat,
    JrdbAct,
    Okutama,
    Ucfarg,
    Mmact,
    Mcad,
}

impl DatasetAdapter {
    pub fn for_kind(kind: DatasetKind) -> Self {
        match kind {
            DatasetKind::Kth => DatasetAdapter::Kth,
            DatasetKind::Virat => DatasetAdapter::Virat,
            DatasetKind::JrdbAct => DatasetAdapter::JrdbAct,
            DatasetKind::Okutama => DatasetAdapter::Okutama,
            DatasetKind::Ucfarg => DatasetAdapter::Ucfarg,
            DatasetKind::Mmact => DatasetAdapter::Mmact,
            DatasetKind::Mcad => DatasetAdapter::Mcad,
        }
    }

    /// Check the format-specific keys before any file is read.
    pub fn check_config(&self, settings: &DatasetSettings) -> AdapterResult<()> {
        match self {
            DatasetAdapter::Kth => kth::check_config(settings),
            DatasetAdapter::Virat => virat::check_config(settings),
            DatasetAdapter::JrdbAct => jrdb::check_config(settings),
            DatasetAdapter::Okutama => okutama::check_config(settings),
            DatasetAdapter::Ucfarg | DatasetAdapter::Mmact | DatasetAdapter::Mcad => Ok(()),
        }
    }

    /// Read the dataset's annotations into canonical records.
    pub fn adapt(&self, settings: &DatasetSettings, options: &AdapterOptions) -> AdapterResult<VideoRecords> {
        self.check_config(settings)?;

        let records = match self {
            DatasetAdapter::Kth => kth::adapt(settings)?,
            DatasetAdapter::Virat => virat::adapt(settings, options)?,
            DatasetAdapter::JrdbAct => jrdb::adapt(settings, options)?,
            DatasetAdapter::Okutama => okutama::adapt(settings, options)?,
            DatasetAdapter::Ucfarg => ucfarg::adapt(settings)?,
            DatasetAdapter::Mmact => mmact::adapt(settings)?,
            DatasetAdapter::Mcad => mcad::adapt(settings)?,
        };

        info!(
            dataset = %settings.kind,
            videos = records.len(),
            records = records.values().map(Vec::len).sum::<usize>(),
            "Annotations normalized"
        );
        Ok(records)
    }
}
