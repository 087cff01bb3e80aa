//! Filesystem helpers for idempotent directory outputs.
//!
//! Decoded frame directories and tubelet directories are rebuilt from
//! scratch on every run. A directory is first produced next to its final
//! location and then swapped in, so a crashed run leaves either the old
//! complete directory or a `*.partial` sibling, never a half-written
//! destination.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MediaResult;

/// Suffix of staging directories.
pub const STAGING_SUFFIX: &str = "partial";

/// Sibling staging path for `dst` (`frames/clip` → `frames/clip.partial`).
pub fn staging_path(dst: &Path) -> PathBuf {
    let mut name = dst.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(STAGING_SUFFIX);
    dst.with_file_name(name)
}

/// Remove `path` if present and create it empty, along with its parents.
pub fn reset_dir(path: &Path) -> MediaResult<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    fs::create_dir_all(path)?;
    Ok(())
}

/// Replace `dst` with the directory at `src`.
///
/// Any previous `dst` is removed first. Falls back to a recursive copy when
/// the two paths are on different filesystems.
pub fn replace_dir(src: &Path, dst: &Path) -> MediaResult<()> {
    if let Some(parent) = dst.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    if dst.exists() {
        fs::remove_dir_all(dst)?;
    }

    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename detected, falling back to copy+delete: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_dir(src, dst)?;
            if let Err(e) = fs::remove_dir_all(src) {
                tracing::warn!("Failed to remove staging directory {}: {}", src.display(), e);
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Check if an IO error is EXDEV (cross-device link).
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

fn copy_dir(src: &Path, dst: &Path) -> MediaResult<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("/tmp/KTH/person01")),
            PathBuf::from("/tmp/KTH/person01.partial")
        );
    }

    #[test]
    fn test_replace_dir_overwrites_previous_output() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("clip.partial");
        let dst = dir.path().join("clip");

        fs::create_dir_all(&dst).unwrap();
        fs::write(dst.join("stale.jpg"), b"old").unwrap();
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("img_00000.jpg"), b"new").unwrap();

        replace_dir(&src, &dst).unwrap();

        assert!(!src.exists(), "staging directory should be gone");
        assert!(dst.join("img_00000.jpg").exists());
        assert!(!dst.join("stale.jpg").exists());
    }

    #[test]
    fn test_reset_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b");
        reset_dir(&path).unwrap();
        fs::write(path.join("x"), b"x").unwrap();
        reset_dir(&path).unwrap();
        assert_eq!(fs::read_dir(&path).unwrap().count(), 0);
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
