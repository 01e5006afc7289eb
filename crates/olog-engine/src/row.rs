//! Display-row construction.
//!
//! One reusable line buffer is padded and overwritten per match, with the
//! fields at fixed column offsets: time, file name, host alias, protocol
//! tag, scaled size, right-justified transport time, archive marker.
//! Bytes below 0x20 in name fields are replaced with `?` and counted.

use chrono::{Local, TimeZone};
use olog_core::{ArchiveStatus, FileSize, Record};

/// Column budget of the transport-time field. Wider values are truncated
/// and marked with a leading `>`.
pub const MAX_DISPLAYED_TRANSFER_TIME: usize = 7;

/// Scale a byte count to a short unit string (`973`, `1.4K`, `2.0M`, …).
pub fn format_size_u64(bytes: u64) -> String {
    const UNITS: [char; 5] = ['K', 'M', 'G', 'T', 'P'];

    if bytes < 1024 {
        return bytes.to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1}{}", value, UNITS[unit])
}

/// Scale a record size; the saturated value prints as `inf`.
pub fn format_size(size: FileSize) -> String {
    match size {
        FileSize::Bytes(bytes) => format_size_u64(bytes),
        FileSize::Infinite => "inf".to_string(),
    }
}

/// The reusable row buffer.
pub struct RowWriter {
    line: String,
    filename_width: usize,
    hostname_width: usize,
    unprintable: u64,
}

impl RowWriter {
    pub fn new(filename_width: usize, hostname_width: usize) -> Self {
        Self {
            line: String::new(),
            filename_width,
            hostname_width,
            unprintable: 0,
        }
    }

    /// The host column width comes from the schema header, which is only
    /// known once a file is mapped.
    pub fn set_hostname_width(&mut self, width: usize) {
        self.hostname_width = width;
    }

    /// Unprintable-byte count accumulated since the last take.
    pub fn take_unprintable(&mut self) -> u64 {
        std::mem::take(&mut self.unprintable)
    }

    fn push_bytes_padded(&mut self, field: &[u8], width: usize) {
        let shown = &field[..field.len().min(width)];
        for &b in shown {
            if b < 0x20 {
                self.line.push('?');
                self.unprintable += 1;
            } else {
                self.line.push(b as char);
            }
        }
        for _ in shown.len()..width {
            self.line.push(' ');
        }
    }

    fn push_transport_time(&mut self, text: &[u8]) {
        let mut shown = String::with_capacity(MAX_DISPLAYED_TRANSFER_TIME);
        if text.len() > MAX_DISPLAYED_TRANSFER_TIME {
            shown.push('>');
            for &b in &text[..MAX_DISPLAYED_TRANSFER_TIME - 1] {
                shown.push(if b < 0x20 { '?' } else { b as char });
            }
        } else {
            for &b in text {
                shown.push(if b < 0x20 { '?' } else { b as char });
            }
        }
        self.line
            .push_str(&format!("{:>width$}", shown, width = MAX_DISPLAYED_TRANSFER_TIME));
    }

    /// Build the display row for one matched record. The returned slice
    /// borrows the internal buffer and is overwritten by the next call.
    pub fn build(&mut self, record: &Record<'_>, name: &[u8], status: ArchiveStatus) -> &str {
        self.line.clear();

        let time = match Local.timestamp_opt(record.ts as i64, 0).single() {
            Some(dt) => dt.format("%d.%m.%Y %H:%M:%S").to_string(),
            None => "??.??.???? ??:??:??".to_string(),
        };
        self.line.push_str(&time);
        self.line.push(' ');

        self.push_bytes_padded(name, self.filename_width);
        self.line.push(' ');

        self.push_bytes_padded(record.host_alias, self.hostname_width);
        self.line.push(' ');

        self.line.push_str(record.protocol.tag());
        self.line.push(' ');

        self.line
            .push_str(&format!("{:>9}", format_size(record.size)));
        self.line.push(' ');

        self.push_transport_time(record.transport_time_text);
        self.line.push(' ');

        self.line.push(status.marker());

        &self.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use olog_core::compose::{ComposeRecord, RecordForm, compose};
    use olog_core::{Direction, LogSchema, Protocol, parse_record};

    fn schema() -> LogSchema {
        LogSchema {
            version: 2,
            log_date_length: 10,
            max_hostname_length: 8,
        }
    }

    fn build_row(record: &ComposeRecord<'_>) -> (String, u64) {
        let schema = schema();
        let line = compose(&schema, record);
        let rec = &line.as_bytes()[..line.len() - 1];
        let parsed = parse_record(rec, &schema, 5, Direction::Delivered).unwrap();

        let mut writer = RowWriter::new(16, 8);
        let status = olog_core::archive_status(parsed.archive_path, parsed.direction, 0);
        let row = writer.build(&parsed, parsed.local_name, status).to_string();
        (row, writer.take_unprintable())
    }

    fn base() -> ComposeRecord<'static> {
        ComposeRecord {
            ts: 0x6000_0000,
            host: "h1",
            form: RecordForm::V2 { output_digit: '0' },
            protocol: Protocol::Ftp,
            local: "a.txt",
            remote: None,
            size_hex: "400",
            transport: "0.04",
            retries: 0,
            job_id: 1,
            archive: None,
        }
    }

    #[test]
    fn columns_are_fixed_width() {
        let (row, unprintable) = build_row(&base());
        assert_eq!(unprintable, 0);

        // time(19) + sp + name(16) + sp + host(8) + sp + proto(5) + sp
        // + size(9) + sp + ttime(7) + sp + marker(1)
        assert_eq!(row.len(), 19 + 1 + 16 + 1 + 8 + 1 + 5 + 1 + 9 + 1 + 7 + 1 + 1);
        assert!(row.contains("a.txt"));
        assert!(row.contains("FTP  "));
        assert!(row.contains("1.0K"));
        assert!(row.ends_with('N'));
    }

    #[test]
    fn wide_transport_time_is_marked() {
        let record = ComposeRecord {
            transport: "123456.78",
            ..base()
        };
        let (row, _) = build_row(&record);
        assert!(row.contains(">123456"));
    }

    #[test]
    fn unprintable_bytes_become_question_marks() {
        let record = ComposeRecord {
            local: "a\u{1}b.txt",
            ..base()
        };
        let (row, unprintable) = build_row(&record);
        assert!(row.contains("a?b.txt"));
        assert_eq!(unprintable, 1);
    }

    #[test]
    fn scaled_sizes() {
        assert_eq!(format_size_u64(0), "0");
        assert_eq!(format_size_u64(973), "973");
        assert_eq!(format_size_u64(1024), "1.0K");
        assert_eq!(format_size_u64(1536), "1.5K");
        assert_eq!(format_size_u64(2 * 1024 * 1024), "2.0M");
        assert_eq!(format_size(FileSize::Infinite), "inf");
    }
}
