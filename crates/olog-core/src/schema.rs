//! The `#!#` schema header.
//!
//! Every log file starts with a header block of `#`-lines. The `#!#`
//! sub-form fixes the field widths the rest of the format depends on:
//!
//! ```text
//! #!# <version> <log_date_length> <max_hostname_length>
//! ```
//!
//! All three fields are decimal, separated by single spaces. A rotated
//! file inherits the header of its predecessor, so the header is present
//! in every file of a chain. A data record before any `#!#` line is a
//! fatal schema error.

use crate::error::{CoreError, Result};

/// Parsed schema fields of one log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSchema {
    pub version: u32,
    /// Width of the leading hex-timestamp field
    pub log_date_length: usize,
    /// Width of the host-alias field
    pub max_hostname_length: usize,
}

impl LogSchema {
    /// Byte offset of the first byte after the host-alias field,
    /// `log_date_length + 1 + max_hostname_length`. Most of the record
    /// geometry is expressed relative to this point.
    pub fn host_field_end(&self) -> usize {
        self.log_date_length + 1 + self.max_hostname_length
    }

    /// Probe stride used by the time index: a jump of this size from a
    /// record start always lands inside the same record for well-formed
    /// data records, so walking to the next `\n` finds the record end.
    pub fn probe_stride(&self) -> usize {
        self.host_field_end() + 3
    }

    /// Parse a single `#!#` header line (without the trailing newline).
    pub fn from_header_line(line: &[u8]) -> Result<Self> {
        let bad = || CoreError::BadSchemaHeader {
            line: String::from_utf8_lossy(line).into_owned(),
        };

        let rest = line.strip_prefix(b"#!#").ok_or_else(bad)?;
        let text = std::str::from_utf8(rest).map_err(|_| bad())?;

        let mut fields = text.split_ascii_whitespace();
        let version: u32 = fields.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        let log_date_length: usize = fields.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;
        let max_hostname_length: usize =
            fields.next().ok_or_else(bad)?.parse().map_err(|_| bad())?;

        if log_date_length == 0 || max_hostname_length == 0 || fields.next().is_some() {
            return Err(bad());
        }

        Ok(Self {
            version,
            log_date_length,
            max_hostname_length,
        })
    }

    /// Scan the header block at the top of a mapped log and extract the
    /// schema. Non-`#!#` header lines are ignored. Hitting a data record
    /// (or the end of the buffer) first is the fatal missing-header case.
    pub fn parse_header(buf: &[u8]) -> Result<Self> {
        let mut pos = 0;

        while pos < buf.len() {
            let end = buf[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|i| pos + i)
                .unwrap_or(buf.len());
            let line = &buf[pos..end];

            if line.starts_with(b"#!#") {
                return Self::from_header_line(line);
            }
            if !line.starts_with(b"#") {
                break;
            }

            pos = end + 1;
        }

        Err(CoreError::MissingSchemaHeader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_block() {
        let buf = b"# output log\n#!# 2 10 8\n60000000  host1   ...\n";
        let schema = LogSchema::parse_header(buf).unwrap();
        assert_eq!(schema.version, 2);
        assert_eq!(schema.log_date_length, 10);
        assert_eq!(schema.max_hostname_length, 8);
        assert_eq!(schema.host_field_end(), 19);
        assert_eq!(schema.probe_stride(), 22);
    }

    #[test]
    fn data_record_before_header_is_fatal() {
        let buf = b"60000000  host1   ...\n#!# 2 10 8\n";
        assert!(matches!(
            LogSchema::parse_header(buf),
            Err(CoreError::MissingSchemaHeader)
        ));
    }

    #[test]
    fn rejects_malformed_headers() {
        for line in [
            &b"#!#"[..],
            b"#!# 2",
            b"#!# 2 10",
            b"#!# 2 0 8",
            b"#!# 2 10 8 extra",
            b"#!# x 10 8",
        ] {
            assert!(LogSchema::from_header_line(line).is_err(), "{line:?}");
        }
    }

    #[test]
    fn empty_file_has_no_schema() {
        assert!(matches!(
            LogSchema::parse_header(b""),
            Err(CoreError::MissingSchemaHeader)
        ));
    }
}
