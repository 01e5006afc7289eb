//! Timestamp positioning inside a mapped log.
//!
//! Records are densely packed and approximately monotonic in time, so a
//! bidirectional linear scan started from whichever end is closer to the
//! target beats a binary search here: one step is a short, cache-friendly
//! jump of `probe_stride` bytes into the record followed by a walk to its
//! newline.

use crate::hex;
use crate::schema::LogSchema;

fn newline_from(buf: &[u8], pos: usize) -> usize {
    buf[pos.min(buf.len())..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|i| pos + i)
        .unwrap_or(buf.len())
}

fn next_line(buf: &[u8], pos: usize) -> usize {
    (newline_from(buf, pos) + 1).min(buf.len())
}

/// Start offset of the line preceding the line that starts at `pos`.
fn prev_line_start(buf: &[u8], pos: usize) -> Option<usize> {
    if pos == 0 {
        return None;
    }
    // pos - 1 is the '\n' terminating the previous line.
    let before = pos.checked_sub(1)?;
    match buf[..before].iter().rposition(|&b| b == b'\n') {
        Some(nl) => Some(nl + 1),
        None => Some(0),
    }
}

/// Timestamp of the record starting at `start`, or `None` for header
/// lines and lines too short or malformed to carry one.
fn record_ts(buf: &[u8], start: usize, schema: &LogSchema) -> Option<u64> {
    if start >= buf.len() || buf[start] == b'#' {
        return None;
    }
    let end = start + schema.log_date_length;
    if end > buf.len() {
        return None;
    }
    hex::parse_timestamp(&buf[start..end])
}

/// First data record from the top, skipping the header block.
fn first_data_record(buf: &[u8], schema: &LogSchema) -> Option<(usize, u64)> {
    let mut pos = 0;
    while pos < buf.len() {
        if let Some(ts) = record_ts(buf, pos, schema) {
            return Some((pos, ts));
        }
        pos = next_line(buf, pos);
    }
    None
}

/// Last data record, walking back from EOF over trailing header or
/// partial lines.
fn last_data_record(buf: &[u8], schema: &LogSchema) -> Option<(usize, u64)> {
    if buf.is_empty() {
        return None;
    }

    let search_end = if buf[buf.len() - 1] == b'\n' {
        buf.len() - 1
    } else {
        buf.len()
    };
    let mut start = match buf[..search_end].iter().rposition(|&b| b == b'\n') {
        Some(nl) => nl + 1,
        None => 0,
    };

    loop {
        if let Some(ts) = record_ts(buf, start, schema) {
            return Some((start, ts));
        }
        start = prev_line_start(buf, start)?;
    }
}

/// Previous data record before the one starting at `pos`.
fn prev_data_record(buf: &[u8], pos: usize, schema: &LogSchema) -> Option<(usize, u64)> {
    let mut start = prev_line_start(buf, pos)?;
    loop {
        if let Some(ts) = record_ts(buf, start, schema) {
            return Some((start, ts));
        }
        start = prev_line_start(buf, start)?;
    }
}

/// Byte offset of the first record whose timestamp is `>= target`.
///
/// Returns `buf.len()` when every record is older than `target` (empty
/// range). With `target` at or before the earliest record, the offset of
/// that record is returned.
pub fn first_record_at(buf: &[u8], schema: &LogSchema, target: u64) -> usize {
    let Some((first_off, first_ts)) = first_data_record(buf, schema) else {
        return buf.len();
    };
    let Some((last_off, last_ts)) = last_data_record(buf, schema) else {
        return buf.len();
    };

    if target > last_ts {
        return buf.len();
    }
    if target <= first_ts {
        return first_off;
    }

    // Scan from whichever end is closer in time.
    if target - first_ts <= last_ts - target {
        scan_forward(buf, schema, first_off, target)
    } else {
        scan_backward(buf, schema, first_off, last_off, target)
    }
}

fn scan_forward(buf: &[u8], schema: &LogSchema, from: usize, target: u64) -> usize {
    let mut pos = from;

    while pos < buf.len() {
        match record_ts(buf, pos, schema) {
            Some(ts) if ts >= target => return pos,
            Some(_) => {
                // Jump inside the record, then walk to its end. Data
                // records are always longer than the probe stride.
                let probe = pos + schema.probe_stride();
                pos = next_line(buf, probe.min(buf.len()));
            }
            None => pos = next_line(buf, pos),
        }
    }

    buf.len()
}

fn scan_backward(
    buf: &[u8],
    schema: &LogSchema,
    first_off: usize,
    last_off: usize,
    target: u64,
) -> usize {
    let mut candidate = last_off;
    let mut pos = last_off;

    while pos > first_off {
        let Some((prev_off, prev_ts)) = prev_data_record(buf, pos, schema) else {
            break;
        };
        if prev_ts < target {
            return candidate;
        }
        candidate = prev_off;
        pos = prev_off;
    }

    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{ComposeRecord, RecordForm, compose, compose_header};
    use crate::record::Protocol;

    fn schema() -> LogSchema {
        LogSchema {
            version: 2,
            log_date_length: 10,
            max_hostname_length: 8,
        }
    }

    fn log_with(timestamps: &[u64]) -> Vec<u8> {
        let schema = schema();
        let mut buf = String::from("# output log\n");
        buf.push_str(&compose_header(&schema));
        for &ts in timestamps {
            let record = ComposeRecord {
                ts,
                host: "h1",
                form: RecordForm::V2 { output_digit: '0' },
                protocol: Protocol::Ftp,
                local: "file.dat",
                remote: None,
                size_hex: "400",
                transport: "0.04",
                retries: 0,
                job_id: 1,
                archive: None,
            };
            buf.push_str(&compose(&schema, &record));
        }
        buf.into_bytes()
    }

    /// Reference implementation: plain line walk.
    fn naive(buf: &[u8], schema: &LogSchema, target: u64) -> usize {
        let mut pos = 0;
        while pos < buf.len() {
            if let Some(ts) = record_ts(buf, pos, schema) {
                if ts >= target {
                    return pos;
                }
            }
            pos = next_line(buf, pos);
        }
        buf.len()
    }

    #[test]
    fn finds_window_start() {
        let buf = log_with(&[0x6000_0000, 0x6000_0010, 0x6000_0020]);
        let schema = schema();

        // Before everything: first record.
        let off = first_record_at(&buf, &schema, 0x5fff_0000);
        assert_eq!(off, naive(&buf, &schema, 0x5fff_0000));
        assert_eq!(record_ts(&buf, off, &schema), Some(0x6000_0000));

        // Between records (Scenario A's start).
        let off = first_record_at(&buf, &schema, 0x6000_0005);
        assert_eq!(record_ts(&buf, off, &schema), Some(0x6000_0010));

        // Exact hit.
        let off = first_record_at(&buf, &schema, 0x6000_0020);
        assert_eq!(record_ts(&buf, off, &schema), Some(0x6000_0020));

        // After everything: empty range.
        assert_eq!(first_record_at(&buf, &schema, 0x6000_0021), buf.len());
    }

    #[test]
    fn header_only_file_yields_empty_range() {
        let schema = schema();
        let buf = compose_header(&schema).into_bytes();
        assert_eq!(first_record_at(&buf, &schema, 0), buf.len());
    }

    #[test]
    fn duplicate_timestamps_resolve_to_first() {
        let buf = log_with(&[10, 20, 20, 20, 30]);
        let schema = schema();
        let off = first_record_at(&buf, &schema, 20);
        assert_eq!(off, naive(&buf, &schema, 20));
    }

    #[test]
    fn trailing_partial_line_is_ignored() {
        let mut buf = log_with(&[10, 20, 30]);
        buf.extend_from_slice(b"0000001e"); // incomplete record, no '\n'
        let schema = schema();

        // The partial tail has no parseable timestamp at the full width,
        // so the last complete record still bounds the search.
        let off = first_record_at(&buf, &schema, 25);
        assert_eq!(record_ts(&buf, off, &schema), Some(30));
    }

    proptest::proptest! {
        #[test]
        fn matches_naive_scan(
            mut timestamps in proptest::collection::vec(0u64..5000, 1..60),
            target in 0u64..5500,
        ) {
            timestamps.sort_unstable();
            let buf = log_with(&timestamps);
            let schema = schema();
            proptest::prop_assert_eq!(
                first_record_at(&buf, &schema, target),
                naive(&buf, &schema, target)
            );
        }
    }
}
