//! On-disk format of AFD output logs.
//!
//! This crate provides:
//! - Schema header parsing: [`schema`] module
//! - Memory-mapped read access to one log file: [`mapped`] module
//! - Timestamp positioning inside a mapped log: [`seek`] module
//! - Record classification and parsing: [`record`] module
//! - Record composition for tooling and tests: [`compose`] module
//!
//! A log file is a sequence of `\n`-terminated lines. Lines starting with
//! `#` are headers; the `#!#` sub-form carries the schema fields every
//! other offset in the format is derived from. Data records start with a
//! lowercase-hex timestamp and are separator-delimited (`|`) after the
//! fixed-width head fields.

pub mod compose;
pub mod error;
pub mod hex;
pub mod mapped;
pub mod record;
pub mod schema;
pub mod seek;

pub use error::{CoreError, Result};
pub use mapped::MappedLog;
pub use record::{
    ArchiveStatus, Classified, Comparator, ConfirmKind, Direction, FileSize, Protocol, Record,
    SEPARATOR, ViewToggles, archive_status, classify, parse_record,
};
pub use schema::LogSchema;
pub use seek::first_record_at;
