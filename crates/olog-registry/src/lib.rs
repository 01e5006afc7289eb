//! Output-log file discovery and time-window selection.
//!
//! This crate provides functionality for discovering rotated output-log
//! files (`OUTPUT_LOG.0` … `OUTPUT_LOG.N`) in a log directory and selecting
//! the subset that can intersect a query's time window.
//!
//! ## Key Components
//!
//! - **Repository**: the [`LogFile`] descriptor and the directory scan
//! - **FileSet**: window selection over the scanned descriptors
//!
//! ## Usage
//!
//! ```no_run
//! use olog_registry::FileSet;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file_set = FileSet::new("/var/spool/afd/log", "OUTPUT_LOG", 10);
//!
//! // Files whose records may fall inside [start, end), newest first.
//! let files = file_set.select_window(1_700_000_000, Some(1_700_100_000))?;
//! # Ok(())
//! # }
//! ```

pub mod file_set;
pub mod repository;

mod error;

pub use error::{RegistryError, Result};
pub use file_set::{FileSet, SWITCH_GRACE};
pub use repository::{LogFile, scan_log_files};
