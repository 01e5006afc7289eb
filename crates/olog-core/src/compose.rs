//! Record and header composition.
//!
//! The engine only ever reads logs; these helpers exist for the tooling
//! and test side, which has to produce byte-exact files for every schema
//! generation. Raw text is accepted for the size and transport-time
//! fields so that overflowing values can be written deliberately.

use crate::record::{Protocol, SEPARATOR};
use crate::schema::LogSchema;

/// Which head layout to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordForm {
    /// `type_offset = 1`: protocol digit only
    V0,
    /// `type_offset = 3`: output-type digit + protocol digit
    V1 { output_digit: char },
    /// `type_offset = 5`: output-type digit, informational digit,
    /// protocol digit
    V2 { output_digit: char },
}

/// One record to compose.
#[derive(Debug, Clone)]
pub struct ComposeRecord<'a> {
    pub ts: u64,
    pub host: &'a str,
    pub form: RecordForm,
    pub protocol: Protocol,
    pub local: &'a str,
    pub remote: Option<&'a str>,
    /// Raw hex text of the size field
    pub size_hex: &'a str,
    /// Raw decimal text of the transport-time field
    pub transport: &'a str,
    pub retries: u32,
    pub job_id: u64,
    pub archive: Option<&'a str>,
}

/// The `#!#` header line for `schema`, newline included.
pub fn compose_header(schema: &LogSchema) -> String {
    format!(
        "#!# {} {} {}\n",
        schema.version, schema.log_date_length, schema.max_hostname_length
    )
}

/// One full record line, newline included.
pub fn compose(schema: &LogSchema, record: &ComposeRecord<'_>) -> String {
    let sep = SEPARATOR as char;
    let mut line = String::new();

    line.push_str(&format!(
        "{:<width$x}",
        record.ts,
        width = schema.log_date_length
    ));
    line.push(' ');

    let host = if record.host.len() > schema.max_hostname_length {
        &record.host[..schema.max_hostname_length]
    } else {
        record.host
    };
    line.push_str(&format!(
        "{:<width$}",
        host,
        width = schema.max_hostname_length
    ));

    let protocol = record.protocol.digit() as char;
    match record.form {
        RecordForm::V0 => {
            line.push(' ');
            line.push(protocol);
        }
        RecordForm::V1 { output_digit } => {
            line.push(' ');
            line.push(output_digit);
            line.push(' ');
            line.push(protocol);
        }
        RecordForm::V2 { output_digit } => {
            line.push(' ');
            line.push(output_digit);
            line.push(' ');
            line.push(
                char::from_digit(record.retries % 16, 16).unwrap_or('0'),
            );
            line.push(' ');
            line.push(protocol);
        }
    }

    line.push_str(record.local);
    line.push(sep);
    line.push_str(record.remote.unwrap_or(""));
    line.push(sep);
    line.push_str(record.size_hex);
    line.push(sep);
    line.push_str(record.transport);
    line.push(sep);
    if !matches!(record.form, RecordForm::V0) {
        line.push_str(&format!("{:x}", record.retries));
        line.push(sep);
    }
    line.push_str(&format!("{:x}", record.job_id));
    line.push(sep);
    line.push_str(record.archive.unwrap_or(""));
    line.push('\n');

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_geometry_matches_detection_offsets() {
        let schema = LogSchema {
            version: 2,
            log_date_length: 10,
            max_hostname_length: 8,
        };
        let p = schema.host_field_end();

        let record = ComposeRecord {
            ts: 0x6000_0000,
            host: "h1",
            form: RecordForm::V2 { output_digit: '0' },
            protocol: Protocol::Sftp,
            local: "f",
            remote: None,
            size_hex: "0",
            transport: "0.0",
            retries: 0x12,
            job_id: 1,
            archive: None,
        };

        let line = compose(&schema, &record);
        let bytes = line.as_bytes();
        assert_eq!(bytes[p], b' ');
        assert_eq!(bytes[p + 1], b'0');
        assert_eq!(bytes[p + 2], b' ');
        assert_eq!(bytes[p + 3], b'2'); // low retry digit
        assert_eq!(bytes[p + 4], b' ');
        assert_eq!(bytes[p + 5], b'2'); // SFTP

        let record = ComposeRecord {
            form: RecordForm::V0,
            ..record
        };
        let line = compose(&schema, &record);
        let bytes = line.as_bytes();
        assert_eq!(bytes[p + 1], b'2');
        assert_ne!(bytes[p + 2], b' '); // local name abuts the protocol digit
    }
}
