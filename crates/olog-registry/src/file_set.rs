//! Time-window selection over a scanned set of rotated log files.

use crate::error::Result;
use crate::repository::{LogFile, scan_log_files};
use std::path::PathBuf;

/// Grace period added to a file's mtime when deciding whether it may still
/// contain records at or after the window start. Covers the gap between the
/// last record written and the rename performed by log rotation.
pub const SWITCH_GRACE: u64 = 300;

/// The set of rotated log files a query draws from.
///
/// Holds the directory, the base file name and the rotation bound; every
/// selection re-scans the directory so that rotations between queries are
/// picked up.
#[derive(Debug, Clone)]
pub struct FileSet {
    directory: PathBuf,
    base: String,
    max_files: u32,
}

impl FileSet {
    pub fn new(directory: impl Into<PathBuf>, base: impl Into<String>, max_files: u32) -> Self {
        Self {
            directory: directory.into(),
            base: base.into(),
            max_files,
        }
    }

    pub fn directory(&self) -> &std::path::Path {
        &self.directory
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Scan the directory and return all present rotated files, newest
    /// (number 0) first.
    pub fn scan(&self) -> Result<Vec<LogFile>> {
        scan_log_files(&self.directory, &self.base, self.max_files)
    }

    /// Scan and select the files whose records may intersect
    /// `[start, end)`, in processing order (newest first).
    ///
    /// `end = None` means "until now", which pins the newest end of the
    /// window to the current file.
    pub fn select_window(&self, start: u64, end: Option<u64>) -> Result<Vec<LogFile>> {
        let files = self.scan()?;
        Ok(select_window(&files, start, end))
    }
}

/// Select the window-overlapping subset of `files` (sorted by number
/// ascending), returned newest-first.
///
/// The oldest file kept is the highest-numbered one whose
/// `mtime + SWITCH_GRACE >= start` — it is the last file that can still
/// hold records at or after the window start. If no file qualifies, the
/// oldest present file is kept as the boundary. The newest file kept is
/// the lowest-numbered one with `mtime >= end`; with no end bound, or when
/// nothing qualifies, the newest present file is used.
pub fn select_window(files: &[LogFile], start: u64, end: Option<u64>) -> Vec<LogFile> {
    if files.is_empty() {
        return Vec::new();
    }

    let oldest_wanted = files
        .iter()
        .filter(|f| f.mtime + SWITCH_GRACE >= start)
        .map(|f| f.number)
        .max()
        .unwrap_or_else(|| files.last().map(|f| f.number).unwrap_or(0));

    let newest_wanted = match end {
        None => files.first().map(|f| f.number).unwrap_or(0),
        Some(end) => files
            .iter()
            .filter(|f| f.mtime >= end)
            .map(|f| f.number)
            .min()
            .unwrap_or_else(|| files.first().map(|f| f.number).unwrap_or(0)),
    };

    files
        .iter()
        .filter(|f| f.number >= newest_wanted && f.number <= oldest_wanted)
        .cloned()
        .collect()
}
