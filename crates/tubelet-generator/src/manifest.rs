//! Manifest files: `<name> <frame_count> <class_index>` per line.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{GeneratorError, GeneratorResult};

/// One manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    pub frame_count: usize,
    pub class_index: usize,
}

impl ManifestEntry {
    /// Activity field of the tubelet name (third `-` field).
    pub fn activity(&self) -> Option<&str> {
        self.name.split('-').nth(2)
    }
}

/// Read a manifest. Blank lines are ignored.
pub fn read_manifest(path: &Path) -> GeneratorResult<Vec<ManifestEntry>> {
    let text = read_required(path)?;
    let mut entries = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [name, count, class] = fields.as_slice() else {
            return Err(GeneratorError::manifest(path, i + 1, "expected 3 fields"));
        };
        let frame_count = count
            .parse()
            .map_err(|_| GeneratorError::manifest(path, i + 1, format!("invalid frame count '{}'", count)))?;
        let class_index = class
            .parse()
            .map_err(|_| GeneratorError::manifest(path, i + 1, format!("invalid class index '{}'", class)))?;
        entries.push(ManifestEntry {
            name: name.to_string(),
            frame_count,
            class_index,
        });
    }
    Ok(entries)
}

pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> GeneratorResult<()> {
    let mut text = String::new();
    for e in entries {
        let _ = writeln!(text, "{} {} {}", e.name, e.frame_count, e.class_index);
    }
    fs::write(path, text).map_err(|e| GeneratorError::io(path, e))
}

/// Read a one-entry-per-line file such as a class list.
pub fn read_lines(path: &Path) -> GeneratorResult<Vec<String>> {
    Ok(read_required(path)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn write_lines(path: &Path, lines: &[String]) -> GeneratorResult<()> {
    let mut text = String::new();
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    fs::write(path, text).map_err(|e| GeneratorError::io(path, e))
}

fn read_required(path: &Path) -> GeneratorResult<String> {
    if !path.is_file() {
        return Err(GeneratorError::MissingInput(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|e| GeneratorError::io(path, e))
}
