//! Deterministic tubelet directory names.
//!
//! A tubelet directory is named
//! `{DATASET}-{source_id}-{activity}-{start}_{end}-{tail}` where `tail` is
//! `p{part}` or `t{actor}_p{part}`. Every component is normalized so the
//! name always splits into exactly five `-` separated fields.
//!
//! A source id is the readable form of the video key, followed by
//! `~{digest}` when normalizing the key lost information. Two distinct
//! video keys therefore never share a source id.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::dataset::DatasetKind;

/// Field separator of tubelet names.
pub const NAME_SEPARATOR: char = '-';

/// Separates the readable part of a source id from the key digest.
pub const DIGEST_SEPARATOR: char = '~';

const DIGEST_LEN: usize = 8;

/// Replace characters that would break `-`-delimited parsing or path
/// handling with `_`.
pub fn normalize_component(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | '/' | '\\' | '.' | ':' | '~' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect()
}

/// Source id of a video key.
///
/// The readable part drops the extension of the final component and is
/// normalized. Unless it equals the raw key, the first hex digits of the
/// key's SHA-256 are appended.
pub fn source_id_for(video_key: &str) -> String {
    let path = Path::new(video_key);
    let stripped = match (path.parent(), path.file_stem()) {
        (Some(parent), Some(stem)) if !parent.as_os_str().is_empty() => {
            parent.join(stem).to_string_lossy().into_owned()
        }
        (_, Some(stem)) => stem.to_string_lossy().into_owned(),
        _ => video_key.to_string(),
    };
    let readable = normalize_component(&stripped);
    if readable == video_key {
        return readable;
    }
    let digest = format!("{:x}", Sha256::digest(video_key.as_bytes()));
    format!("{}{}{}", readable, DIGEST_SEPARATOR, &digest[..DIGEST_LEN])
}

/// Readable part of a source id, without the key digest.
pub fn source_label(source_id: &str) -> &str {
    source_id
        .split_once(DIGEST_SEPARATOR)
        .map_or(source_id, |(label, _)| label)
}

/// Identity of one materialized tubelet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TubeletName {
    pub dataset: DatasetKind,
    pub source_id: String,
    pub activity: String,
    pub actor: Option<String>,
    pub start_frame: u64,
    pub end_frame: u64,
    pub part: usize,
}

impl TubeletName {
    /// Build a name, normalizing every free-form component.
    pub fn new(
        dataset: DatasetKind,
        video_key: &str,
        activity: &str,
        actor: Option<&str>,
        start_frame: u64,
        end_frame: u64,
        part: usize,
    ) -> Self {
        Self {
            dataset,
            source_id: source_id_for(video_key),
            activity: normalize_component(activity),
            actor: actor.map(normalize_component),
            start_frame,
            end_frame,
            part,
        }
    }

    pub fn source_label(&self) -> &str {
        source_label(&self.source_id)
    }
}

impl fmt::Display for TubeletName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}_{}-",
            self.dataset, self.source_id, self.activity, self.start_frame, self.end_frame
        )?;
        match &self.actor {
            Some(actor) => write!(f, "t{}_p{}", actor, self.part),
            None => write!(f, "p{}", self.part),
        }
    }
}

/// Why a directory name is not a tubelet name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameParseError {
    #[error("expected 5 '-' separated fields, found {0}")]
    FieldCount(usize),

    #[error("unknown dataset prefix '{0}'")]
    UnknownDataset(String),

    #[error("invalid frame range '{0}'")]
    FrameRange(String),

    #[error("invalid part suffix '{0}'")]
    Part(String),
}

impl FromStr for TubeletName {
    type Err = NameParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split(NAME_SEPARATOR).collect();
        let [dataset, source_id, activity, range, tail] = fields.as_slice() else {
            return Err(NameParseError::FieldCount(fields.len()));
        };

        let dataset = dataset
            .parse::<DatasetKind>()
            .map_err(|_| NameParseError::UnknownDataset(dataset.to_string()))?;

        let (start, end) = range
            .split_once('_')
            .and_then(|(a, b)| Some((a.parse::<u64>().ok()?, b.parse::<u64>().ok()?)))
            .ok_or_else(|| NameParseError::FrameRange(range.to_string()))?;

        let (actor, part) = parse_tail(tail).ok_or_else(|| NameParseError::Part(tail.to_string()))?;

        Ok(TubeletName {
            dataset,
            source_id: source_id.to_string(),
            activity: activity.to_string(),
            actor,
            start_frame: start,
            end_frame: end,
            part,
        })
    }
}

fn parse_tail(tail: &str) -> Option<(Option<String>, usize)> {
    let (actor, part) = match tail.rsplit_once("_p") {
        Some((actor, part)) => (Some(actor.strip_prefix('t')?.to_string()), part),
        None => (None, tail.strip_prefix('p')?),
    };
    Some((actor, part.parse().ok()?))
}
