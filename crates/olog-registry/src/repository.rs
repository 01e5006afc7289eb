//! Descriptors for rotated output-log files.
//!
//! An output-log directory holds a bounded chain of rotated files named
//! `<base>.0` (current) through `<base>.N` (oldest). Rotation renames the
//! current file upwards, so a file's identity across a scan is its inode,
//! not its name.

use crate::error::{RegistryError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::warn;

/// Descriptor for one rotated log file, with the filesystem metadata
/// captured at scan time.
///
/// Content is treated as append-only; if the inode under `path` changes,
/// the file has rotated and must be re-opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFile {
    /// Rotation index; 0 is the current file
    pub number: u32,
    /// Full path at open time
    pub path: PathBuf,
    /// Size in bytes at open time
    pub size: u64,
    /// Modification time, seconds since epoch
    pub mtime: u64,
    /// Inode at open time
    pub inode: u64,
}

fn log_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?P<base>[A-Za-z0-9_]+)\.(?P<number>\d+)$").unwrap())
}

impl LogFile {
    /// Parse a rotated log-file path of the form `<base>.<number>`.
    ///
    /// Returns `None` for paths that do not look like rotated log files or
    /// whose base name does not match `base`. No filesystem access happens
    /// here; use [`LogFile::stat`] to fill in the metadata.
    pub fn from_path(path: &Path, base: &str) -> Option<(u32, PathBuf)> {
        let name = path.file_name()?.to_str()?;
        let captures = log_name_regex().captures(name)?;

        if &captures["base"] != base {
            return None;
        }

        let number: u32 = captures["number"].parse().ok()?;
        Some((number, path.to_path_buf()))
    }

    /// Stat `path` and build a descriptor.
    ///
    /// A missing file yields `Ok(None)` (rotated files come and go); any
    /// other metadata error is returned to the caller.
    pub fn stat(number: u32, path: PathBuf) -> Result<Option<Self>> {
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RegistryError::Io(e)),
        };

        Ok(Some(Self {
            number,
            size: metadata.len(),
            mtime: metadata.mtime().max(0) as u64,
            inode: metadata.ino(),
            path,
        }))
    }
}

/// Scan a log directory for rotated files `base.0 … base.(max_files - 1)`.
///
/// Missing numbers are silently skipped. Files that exist but cannot be
/// stat'ed produce a warning and are skipped, so one unreadable file does
/// not abort the run. The result is sorted by rotation number ascending,
/// i.e. newest file first.
pub fn scan_log_files(directory: &Path, base: &str, max_files: u32) -> Result<Vec<LogFile>> {
    if !directory.is_dir() {
        return Err(RegistryError::NotADirectory {
            path: directory.to_path_buf(),
        });
    }

    let mut files = Vec::new();

    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;

        let Some((number, path)) = LogFile::from_path(&entry.path(), base) else {
            continue;
        };

        if number >= max_files {
            continue;
        }

        match LogFile::stat(number, path) {
            Ok(Some(file)) => files.push(file),
            Ok(None) => {} // Raced with rotation, treat as missing
            Err(e) => {
                warn!(
                    file = %entry.path().display(),
                    error = %e,
                    "Skipping unreadable log file"
                );
            }
        }
    }

    files.sort_by_key(|f| f.number);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_accepts_rotated_names() {
        let (number, _) = LogFile::from_path(Path::new("/logs/OUTPUT_LOG.3"), "OUTPUT_LOG").unwrap();
        assert_eq!(number, 3);

        assert!(LogFile::from_path(Path::new("/logs/OUTPUT_LOG"), "OUTPUT_LOG").is_none());
        assert!(LogFile::from_path(Path::new("/logs/OUTPUT_LOG.x"), "OUTPUT_LOG").is_none());
        assert!(LogFile::from_path(Path::new("/logs/TRANSFER_LOG.1"), "OUTPUT_LOG").is_none());
    }

    #[test]
    fn scan_skips_missing_numbers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("OUTPUT_LOG.0"), b"#!# 2 10 8\n").unwrap();
        std::fs::write(dir.path().join("OUTPUT_LOG.4"), b"#!# 2 10 8\n").unwrap();
        std::fs::write(dir.path().join("unrelated.txt"), b"x").unwrap();

        let files = scan_log_files(dir.path(), "OUTPUT_LOG", 10).unwrap();
        let numbers: Vec<u32> = files.iter().map(|f| f.number).collect();
        assert_eq!(numbers, vec![0, 4]);
    }

    #[test]
    fn scan_honours_rotation_bound() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("OUTPUT_LOG.0"), b"").unwrap();
        std::fs::write(dir.path().join("OUTPUT_LOG.12"), b"").unwrap();

        let files = scan_log_files(dir.path(), "OUTPUT_LOG", 10).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].number, 0);
    }
}
