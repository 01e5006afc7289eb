//! Shared helpers: log-file authoring and a recording sink.

// Not every test binary uses every helper.
#![allow(dead_code)]

use olog_core::LogSchema;
use olog_core::compose::{ComposeRecord, RecordForm, compose, compose_header};
use olog_core::record::Protocol;
use olog_engine::sink::{Batch, EventSink, RowEntry};
use std::path::Path;

pub fn schema() -> LogSchema {
    LogSchema {
        version: 2,
        log_date_length: 10,
        max_hostname_length: 8,
    }
}

/// A delivered FTP record with defaults suitable for most tests.
pub fn delivered(ts: u64, local: &'static str) -> ComposeRecord<'static> {
    ComposeRecord {
        ts,
        host: "h1",
        form: RecordForm::V2 { output_digit: '0' },
        protocol: Protocol::Ftp,
        local,
        remote: None,
        size_hex: "400",
        transport: "0.04",
        retries: 0,
        job_id: 0x1234_5678,
        archive: None,
    }
}

/// Write a full log file: header block plus the given records.
pub fn write_log(path: &Path, records: &[ComposeRecord<'_>]) {
    let schema = schema();
    let mut content = compose_header(&schema);
    for record in records {
        content.push_str(&compose(&schema, record));
    }
    std::fs::write(path, content).unwrap();
}

/// Render records to their on-disk lines (no header), for appends.
pub fn render(records: &[ComposeRecord<'_>]) -> String {
    let schema = schema();
    records.iter().map(|r| compose(&schema, r)).collect()
}

/// Everything the engine emitted, in order.
#[derive(Debug)]
pub enum Event {
    Batch(Vec<RowEntry>),
    Summary(String),
    Status(String),
    Fatal(String),
}

#[derive(Debug, Default)]
pub struct CollectSink {
    pub events: Vec<Event>,
}

impl CollectSink {
    pub fn rows(&self) -> Vec<&RowEntry> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Batch(rows) => Some(rows.iter()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn statuses(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Status(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn summary_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Summary(_)))
            .count()
    }
}

impl EventSink for CollectSink {
    fn on_batch(&mut self, batch: Batch) {
        self.events.push(Event::Batch(batch.rows));
    }

    fn on_summary(&mut self, summary: &str) {
        self.events.push(Event::Summary(summary.to_string()));
    }

    fn on_status(&mut self, status: &str) {
        self.events.push(Event::Status(status.to_string()));
    }

    fn on_fatal(&mut self, message: &str) {
        self.events.push(Event::Fatal(message.to_string()));
    }
}
