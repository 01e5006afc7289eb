//! Record classification and parsing.
//!
//! A data record is one `\n`-terminated line:
//!
//! ```text
//! <hex_ts, log_date_length wide> ' ' <hostalias, max_hostname_length wide>
//!   <head fields, see below>
//!   <local>|<remote>|<size_hex>|<transport_time>|[<retries_hex>|]<job_id_hex>|[<archive_path>]
//! ```
//!
//! The head fields between the host alias and the local name vary with the
//! record's schema generation. With `P = log_date_length + 1 +
//! max_hostname_length`:
//!
//! - `type_offset = 1`: `' '` at `P`, protocol digit at `P+1`
//! - `type_offset = 3`: `' '`, output-type digit, `' '`, protocol digit
//! - `type_offset = 5`: as above plus one informational digit and `' '`
//!   before the protocol digit
//!
//! The generation is inferred per record from the bytes at `P+2` and
//! `P+4`; that is what [`classify`] does. Truncated or otherwise
//! impossible records classify or parse as skips, never as errors.

use crate::hex;
use crate::schema::LogSchema;
use serde::{Deserialize, Serialize};

/// Field separator of the record body.
pub const SEPARATOR: u8 = b'|';

/// Archive-path component (0-based, `/`-separated) that carries the
/// `<delete_time>_` prefix.
pub const ARCHIVE_SUB_DIR_LEVEL: usize = 2;

/// Seconds after its delete time an archived payload is assumed gone.
pub const ARCHIVE_STEP_TIME: u64 = 3600;

// Output-type digits in the record head.
const OT_NORMAL_DELIVERED: u8 = b'0';
const OT_NORMAL_RECEIVED: u8 = b'5';

/// Transfer protocol, one hex digit in the record head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Ftp,
    Ftps,
    Sftp,
    Scp,
    Http,
    Https,
    Smtp,
    Smtps,
    Loc,
    Exec,
    Wmo,
    Map,
    Dfax,
    Demail,
}

impl Protocol {
    pub fn from_digit(digit: u8) -> Option<Self> {
        Some(match digit {
            b'0' => Self::Ftp,
            b'1' => Self::Ftps,
            b'2' => Self::Sftp,
            b'3' => Self::Scp,
            b'4' => Self::Http,
            b'5' => Self::Https,
            b'6' => Self::Smtp,
            b'7' => Self::Smtps,
            b'8' => Self::Loc,
            b'9' => Self::Exec,
            b'a' => Self::Wmo,
            b'b' => Self::Map,
            b'c' => Self::Dfax,
            b'd' => Self::Demail,
            _ => return None,
        })
    }

    pub fn digit(&self) -> u8 {
        match self {
            Self::Ftp => b'0',
            Self::Ftps => b'1',
            Self::Sftp => b'2',
            Self::Scp => b'3',
            Self::Http => b'4',
            Self::Https => b'5',
            Self::Smtp => b'6',
            Self::Smtps => b'7',
            Self::Loc => b'8',
            Self::Exec => b'9',
            Self::Wmo => b'a',
            Self::Map => b'b',
            Self::Dfax => b'c',
            Self::Demail => b'd',
        }
    }

    /// Five-character display tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Ftp => "FTP  ",
            Self::Ftps => "FTPS ",
            Self::Sftp => "SFTP ",
            Self::Scp => "SCP  ",
            Self::Http => "HTTP ",
            Self::Https => "HTTPS",
            Self::Smtp => "SMTP ",
            Self::Smtps => "SMTPS",
            Self::Loc => "LOC  ",
            Self::Exec => "EXEC ",
            Self::Wmo => "WMO  ",
            Self::Map => "MAP  ",
            Self::Dfax => "DFAX ",
            Self::Demail => "DMAIL",
        }
    }
}

/// The four confirmation record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfirmKind {
    Dispatch,
    Retrieve,
    Receipt,
    TimeUp,
}

impl ConfirmKind {
    fn from_digit(digit: u8) -> Option<Self> {
        Some(match digit {
            b'6' => Self::Dispatch,
            b'7' => Self::Retrieve,
            b'8' => Self::Receipt,
            b'9' => Self::TimeUp,
            _ => return None,
        })
    }

    /// Archive-status letter shown for an unarchived confirmation.
    pub fn marker(&self) -> char {
        match self {
            Self::Dispatch => 'd',
            Self::Retrieve => 'r',
            Self::Receipt => 'R',
            Self::TimeUp => 't',
        }
    }
}

/// What a record documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Delivered,
    Received,
    Confirmation(ConfirmKind),
}

/// Direction and confirmation toggles of the active query, needed during
/// classification because they decide which records are skipped outright.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewToggles {
    pub confirmation: bool,
    pub received_only: bool,
    pub output_only: bool,
    pub archived_only: bool,
}

/// Result of classifying one record head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classified {
    Keep {
        type_offset: usize,
        direction: Direction,
    },
    Skip,
}

/// Infer `type_offset` and direction from the record head (§ record
/// geometry above) and apply the direction toggles.
pub fn classify(rec: &[u8], schema: &LogSchema, toggles: &ViewToggles) -> Classified {
    let p = schema.host_field_end();

    if rec.len() <= p + 2 {
        return Classified::Skip;
    }

    let (type_offset, direction) = if rec[p + 2] == b' ' {
        if rec.len() > p + 4 && rec[p + 4] == b' ' {
            match rec[p + 1] {
                OT_NORMAL_DELIVERED => (5, Direction::Delivered),
                OT_NORMAL_RECEIVED => (5, Direction::Received),
                digit => match ConfirmKind::from_digit(digit) {
                    Some(kind) if toggles.confirmation => (5, Direction::Confirmation(kind)),
                    _ => return Classified::Skip,
                },
            }
        } else {
            (3, Direction::Delivered)
        }
    } else {
        (1, Direction::Delivered)
    };

    if toggles.received_only && direction == Direction::Delivered {
        return Classified::Skip;
    }
    if (toggles.output_only || toggles.archived_only) && direction == Direction::Received {
        return Classified::Skip;
    }

    Classified::Keep {
        type_offset,
        direction,
    }
}

/// A file size with the format's overflow-to-infinity policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSize {
    Bytes(u64),
    /// More than 15 hex digits on disk. Greater than everything finite,
    /// equal to nothing.
    Infinite,
}

/// Comparison operator of the size and transport-time filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    Equal,
    Less,
    Greater,
    NotEqual,
}

impl FileSize {
    /// Saturating add for the summary totals.
    pub fn saturating_value(&self) -> u64 {
        match self {
            Self::Bytes(b) => *b,
            Self::Infinite => u64::MAX,
        }
    }

    /// Evaluate `self <op> value` under the saturating semantics.
    pub fn compare(&self, op: Comparator, value: u64) -> bool {
        match self {
            Self::Infinite => matches!(op, Comparator::Greater | Comparator::NotEqual),
            Self::Bytes(b) => match op {
                Comparator::Equal => *b == value,
                Comparator::Less => *b < value,
                Comparator::Greater => *b > value,
                Comparator::NotEqual => *b != value,
            },
        }
    }
}

/// The parsed view of one record. Name and path fields borrow from the
/// mapped file.
#[derive(Debug, Clone)]
pub struct Record<'a> {
    pub ts: u64,
    pub host_alias: &'a [u8],
    pub type_offset: usize,
    pub direction: Direction,
    pub protocol: Protocol,
    pub local_name: &'a [u8],
    pub remote_name: Option<&'a [u8]>,
    pub size: FileSize,
    pub transport_time: f64,
    /// Raw transport-time text, for width-limited display
    pub transport_time_text: &'a [u8],
    /// Zero for `type_offset == 1` records, which carry no retries field
    pub retries: u32,
    pub job_id: u64,
    pub archive_path: Option<&'a [u8]>,
    /// Offset, relative to the record start, of the job-id field — the
    /// first field after retries and the anchor for later archive lookup.
    pub data_offset: usize,
}

struct FieldCursor<'a> {
    rec: &'a [u8],
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    /// Next separator-terminated field, with its start offset.
    fn next(&mut self) -> Option<(&'a [u8], usize)> {
        let start = self.pos;
        let len = self.rec[start..].iter().position(|&b| b == SEPARATOR)?;
        self.pos = start + len + 1;
        Some((&self.rec[start..start + len], start))
    }

    /// Everything after the last separator.
    fn rest(self) -> (&'a [u8], usize) {
        (&self.rec[self.pos..], self.pos)
    }
}

/// Parse one record whose head has already been classified.
///
/// `rec` is the record without its trailing `\n`. Returns `None` for any
/// truncated or malformed body; the caller counts and skips it.
pub fn parse_record<'a>(
    rec: &'a [u8],
    schema: &LogSchema,
    type_offset: usize,
    direction: Direction,
) -> Option<Record<'a>> {
    let p = schema.host_field_end();
    let name_start = p + type_offset + 1;

    if rec.len() <= name_start {
        return None;
    }

    let ts = hex::parse_timestamp(&rec[..schema.log_date_length])?;

    let host_alias = {
        let field = &rec[schema.log_date_length + 1..p];
        let end = field
            .iter()
            .rposition(|&b| b != b' ')
            .map(|i| i + 1)
            .unwrap_or(0);
        &field[..end]
    };

    let protocol = Protocol::from_digit(rec[p + type_offset])?;

    let mut cursor = FieldCursor {
        rec,
        pos: name_start,
    };

    let (local_name, _) = cursor.next()?;
    if local_name.is_empty() {
        return None;
    }

    let (remote_field, _) = cursor.next()?;
    let remote_name = if remote_field.is_empty() {
        None
    } else {
        Some(remote_field)
    };

    let (size_field, _) = cursor.next()?;
    let size = hex::parse_size(size_field)?;

    let (transport_field, _) = cursor.next()?;
    let transport_time: f64 = std::str::from_utf8(transport_field).ok()?.parse().ok()?;

    let retries = if type_offset > 1 {
        let (retries_field, _) = cursor.next()?;
        hex::parse_u32(retries_field)?
    } else {
        0
    };

    let (job_field, data_offset) = cursor.next()?;
    let job_id = hex::parse_u64(job_field)?;

    let (archive_field, _) = cursor.rest();
    let archive_path = if archive_field.is_empty() {
        None
    } else {
        Some(archive_field)
    };

    Some(Record {
        ts,
        host_alias,
        type_offset,
        direction,
        protocol,
        local_name,
        remote_name,
        size,
        transport_time,
        transport_time_text: transport_field,
        retries,
        job_id,
        archive_path,
        data_offset,
    })
}

/// One-character archive status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveStatus {
    /// `Y` — payload still retrievable
    Archived,
    /// `N` — delivered without archiving
    NotArchived,
    /// `D` — archive delete time has long passed
    Deleted,
    /// `?` — inside the deletion window, retrievability unknown
    Uncertain,
    /// `*` — received records are never archived
    Received,
    /// Confirmation kind letter
    Confirmation(ConfirmKind),
}

impl ArchiveStatus {
    pub fn marker(&self) -> char {
        match self {
            Self::Archived => 'Y',
            Self::NotArchived => 'N',
            Self::Deleted => 'D',
            Self::Uncertain => '?',
            Self::Received => '*',
            Self::Confirmation(kind) => kind.marker(),
        }
    }

    pub fn is_archived(&self) -> bool {
        matches!(self, Self::Archived)
    }
}

/// Split an archive path on unescaped `/` (a preceding `\` escapes).
fn path_components(path: &[u8]) -> Vec<&[u8]> {
    let mut components = Vec::new();
    let mut start = 0;

    for i in 0..path.len() {
        if path[i] == b'/' && (i == 0 || path[i - 1] != b'\\') {
            components.push(&path[start..i]);
            start = i + 1;
        }
    }
    components.push(&path[start..]);
    components
}

/// Derive the archive status from the archive path and direction.
///
/// The component at [`ARCHIVE_SUB_DIR_LEVEL`] starts with the hex delete
/// time followed by `_`. All arithmetic saturates so a zero delete time
/// cannot wrap.
pub fn archive_status(archive_path: Option<&[u8]>, direction: Direction, now: u64) -> ArchiveStatus {
    let Some(path) = archive_path else {
        return match direction {
            Direction::Received => ArchiveStatus::Received,
            Direction::Delivered => ArchiveStatus::NotArchived,
            Direction::Confirmation(kind) => ArchiveStatus::Confirmation(kind),
        };
    };

    let components = path_components(path);
    let delete_time = components
        .get(ARCHIVE_SUB_DIR_LEVEL)
        .and_then(|component| {
            let end = component
                .iter()
                .position(|&b| b == b'_')
                .unwrap_or(component.len());
            hex::parse_u64(&component[..end])
        });

    match delete_time {
        Some(delete_time) => {
            if now > delete_time.saturating_add(ARCHIVE_STEP_TIME) {
                ArchiveStatus::Deleted
            } else if now > delete_time.saturating_sub(5) {
                ArchiveStatus::Uncertain
            } else {
                ArchiveStatus::Archived
            }
        }
        // Path present but not in the expected shape; retrievability is
        // unknown rather than an error.
        None => ArchiveStatus::Uncertain,
    }
}
