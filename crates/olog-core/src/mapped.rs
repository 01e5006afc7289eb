//! Read-only memory-mapped view of one log file.

use crate::error::Result;
use memmap2::Mmap;
use std::fs::File;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// A full-content, byte-accurate view of a log file.
///
/// The mapping is scoped to a single file's scan; it is dropped before the
/// next file in the chain is opened. Zero-length files carry no mapping
/// (mapping an empty file is not portable) and expose an empty slice.
#[derive(Debug)]
pub struct MappedLog {
    mmap: Option<Mmap>,
    inode: u64,
    len: usize,
}

impl MappedLog {
    /// Open and map `path`. The inode recorded here is compared against
    /// later stats to detect rotation.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        let len = metadata.len() as usize;

        let mmap = if len == 0 {
            None
        } else {
            // Safety: the mapping is read-only and log files are
            // append-only; bytes below `len` are never rewritten.
            Some(unsafe { Mmap::map(&file)? })
        };

        Ok(Self {
            mmap,
            inode: metadata.ino(),
            len,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[..self.len],
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn inode(&self) -> u64 {
        self.inode
    }
}
