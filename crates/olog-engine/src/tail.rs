//! Live-tail state over the current log file.
//!
//! After the initial scan a second descriptor stays positioned on the
//! current log. Each poll stats the path: growth under the same inode
//! yields the new complete records as a delta with their absolute base
//! offset; an inode change means the log rotated, in which case the
//! still-open old descriptor is drained before the caller restarts the
//! whole query.

use std::fs::File;
use std::os::unix::fs::{FileExt, MetadataExt};
use std::path::PathBuf;

/// What one poll observed.
#[derive(Debug)]
pub(crate) enum TailEvent {
    /// No new complete records
    Quiet,
    /// New complete records; `base` is the absolute offset of `data[0]`
    Grown { base: u64, data: Vec<u8> },
    /// Inode changed (or the path vanished). `remainder` holds complete
    /// records the old file still had past the consumed offset.
    Rotated { remainder: Option<(u64, Vec<u8>)> },
}

pub(crate) struct TailState {
    path: PathBuf,
    file: Option<File>,
    inode: u64,
    /// Absolute offset of the next unconsumed byte
    offset: u64,
}

impl TailState {
    /// Attach to the current log. `consumed` is how far the initial scan
    /// got; `expected_inode` is the inode of the mapping that was
    /// scanned. Returns `None` when the file rotated between the scan and
    /// this open — the caller should restart the query.
    pub fn attach(path: PathBuf, expected_inode: u64, consumed: u64) -> std::io::Result<Option<Self>> {
        let file = match File::open(&path) {
            Ok(file) => file,
            // Not present yet (or just rotated away): poll will pick the
            // new file up from offset zero.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Some(Self {
                    path,
                    file: None,
                    inode: 0,
                    offset: 0,
                }));
            }
            Err(e) => return Err(e),
        };

        let inode = file.metadata()?.ino();
        if expected_inode != 0 && inode != expected_inode {
            return Ok(None);
        }

        Ok(Some(Self {
            path,
            file: Some(file),
            inode,
            offset: consumed,
        }))
    }

    /// One poll step.
    pub fn poll(&mut self) -> std::io::Result<TailEvent> {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return self.rotated();
            }
            Err(e) => return Err(e),
        };

        match &self.file {
            None => {
                let file = File::open(&self.path)?;
                self.inode = file.metadata()?.ino();
                self.offset = 0;
                self.file = Some(file);
            }
            Some(_) if metadata.ino() != self.inode => return self.rotated(),
            Some(_) => {}
        }

        let Some(file) = self.file.as_ref() else {
            return Ok(TailEvent::Quiet);
        };
        let len = file.metadata()?.len();
        if len <= self.offset {
            return Ok(TailEvent::Quiet);
        }

        let data = read_complete_lines(file, self.offset, len)?;
        if data.is_empty() {
            return Ok(TailEvent::Quiet);
        }

        let base = self.offset;
        self.offset += data.len() as u64;
        Ok(TailEvent::Grown { base, data })
    }

    fn rotated(&mut self) -> std::io::Result<TailEvent> {
        let remainder = match self.file.take() {
            Some(file) => {
                let len = file.metadata()?.len();
                if len > self.offset {
                    let data = read_complete_lines(&file, self.offset, len)?;
                    if data.is_empty() {
                        None
                    } else {
                        Some((self.offset, data))
                    }
                } else {
                    None
                }
            }
            None => None,
        };

        self.inode = 0;
        self.offset = 0;
        Ok(TailEvent::Rotated { remainder })
    }
}

/// Read `[offset, len)` and trim back to the last complete line.
fn read_complete_lines(file: &File, offset: u64, len: u64) -> std::io::Result<Vec<u8>> {
    let mut data = vec![0u8; (len - offset) as usize];
    let n = read_fully_at(file, &mut data, offset)?;
    data.truncate(n);

    match data.iter().rposition(|&b| b == b'\n') {
        Some(nl) => data.truncate(nl + 1),
        None => data.clear(),
    }
    Ok(data)
}

fn read_fully_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
    let mut read = 0;
    while read < buf.len() {
        match file.read_at(&mut buf[read..], offset + read as u64) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(read)
}
