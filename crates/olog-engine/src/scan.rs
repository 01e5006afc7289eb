//! The record scan loop shared by the initial ranged scan and live tail.

use crate::error::Result;
use crate::filter::Predicate;
use crate::items::{ItemEntry, ItemList, LINES_BUFFERED};
use crate::query::Query;
use crate::resolve::Resolver;
use crate::row::RowWriter;
use crate::sink::{Batch, EventSink, RowEntry};
use crate::summary::SessionState;
use olog_core::{Classified, LogSchema, ViewToggles, archive_status, classify, parse_record};
use tokio_util::sync::CancellationToken;

/// Cancellation is probed every this many records during a scan.
pub const CANCEL_PROBE_RECORDS: u32 = 1024;

/// How a call into the scan loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanEnd {
    /// All complete records of the buffer were consumed
    Completed,
    /// A record past the window end was reached
    PastWindow,
    /// The list limit was hit
    LimitReached,
    /// The cancel flag was observed
    Cancelled,
}

/// Mutable scan state of one session. A rotation restart builds a fresh
/// scanner; the item lists inside outlive the run as the viewing index.
pub(crate) struct Scanner<'q> {
    query: &'q Query,
    toggles: ViewToggles,
    predicate: Predicate<'q>,
    row: RowWriter,
    pub state: SessionState,
    pub items: Vec<ItemList>,
    pending: Vec<RowEntry>,
    now: u64,
    records_since_probe: u32,
}

impl<'q> Scanner<'q> {
    pub fn new(query: &'q Query, now: u64) -> Self {
        Self {
            query,
            toggles: query.toggles(),
            predicate: Predicate::new(query),
            row: RowWriter::new(query.max_displayed_filename_len, 0),
            state: SessionState::default(),
            items: Vec::new(),
            pending: Vec::new(),
            now,
            records_since_probe: 0,
        }
    }

    fn items_for(&mut self, file_number: u32) -> &mut ItemList {
        match self
            .items
            .iter()
            .position(|list| list.file_number() == file_number)
        {
            Some(index) => &mut self.items[index],
            None => {
                self.items.push(ItemList::new(file_number));
                self.items.last_mut().unwrap()
            }
        }
    }

    /// Emit the pending batch (if any) and re-emit the running summary.
    pub fn flush(&mut self, sink: &mut dyn EventSink) {
        if self.pending.is_empty() {
            return;
        }
        let rows = std::mem::take(&mut self.pending);
        sink.on_batch(Batch { rows });
        sink.on_summary(&self.state.summary_line());
    }

    fn limit_reached(&self) -> bool {
        self.query.list_limit > 0 && self.state.total_matched as usize >= self.query.list_limit
    }

    /// Scan complete records in `buf` starting at `start_at`.
    ///
    /// `base_offset` is the absolute file offset of `buf[0]`, so item
    /// offsets stay absolute when a tail delta is fed through here.
    /// Returns how the scan ended together with the offset just past the
    /// last consumed line (relative to `buf`).
    #[allow(clippy::too_many_arguments)]
    pub fn scan_buffer(
        &mut self,
        buf: &[u8],
        base_offset: u64,
        schema: &LogSchema,
        file_number: u32,
        start_at: usize,
        resolver: &mut dyn Resolver,
        sink: &mut dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<(ScanEnd, usize)> {
        self.row.set_hostname_width(schema.max_hostname_length);

        let mut pos = start_at;
        let mut consumed = start_at;

        while pos < buf.len() {
            let Some(nl) = buf[pos..].iter().position(|&b| b == b'\n').map(|i| pos + i) else {
                break; // partial trailing record stays unconsumed
            };
            let rec = &buf[pos..nl];
            let next = nl + 1;

            if rec.is_empty() || rec[0] == b'#' {
                pos = next;
                consumed = next;
                continue;
            }

            self.records_since_probe += 1;
            if self.records_since_probe >= CANCEL_PROBE_RECORDS {
                self.records_since_probe = 0;
                if cancel.is_cancelled() {
                    self.flush(sink);
                    return Ok((ScanEnd::Cancelled, next));
                }
            }

            let Classified::Keep {
                type_offset,
                direction,
            } = classify(rec, schema, &self.toggles)
            else {
                pos = next;
                consumed = next;
                continue;
            };

            let Some(record) = parse_record(rec, schema, type_offset, direction) else {
                self.state.ignored += 1;
                pos = next;
                consumed = next;
                continue;
            };

            if record.ts < self.query.start_time {
                pos = next;
                consumed = next;
                continue;
            }
            if let Some(end) = self.query.end_time {
                if record.ts > end {
                    return Ok((ScanEnd::PastWindow, next));
                }
            }

            if !self.predicate.matches(&record, resolver) {
                pos = next;
                consumed = next;
                continue;
            }

            let status = archive_status(record.archive_path, record.direction, self.now);
            if self.query.view_archived_only && !status.is_archived() {
                pos = next;
                consumed = next;
                continue;
            }

            let name = self.predicate.display_name(&record);
            let text = self.row.build(&record, name, status).to_string();
            self.state.unprintable_chars += self.row.take_unprintable();
            self.state
                .note_match(record.ts, record.size, record.transport_time);

            let line_offset = base_offset + pos as u64;
            let data_offset = base_offset + pos as u64 + record.data_offset as u64;
            let archived = record.archive_path.is_some();

            self.items_for(file_number).push(ItemEntry {
                line_offset,
                data_offset,
                archived,
            })?;
            self.pending.push(RowEntry {
                text,
                file_number,
                line_offset,
                data_offset,
                archived,
            });

            pos = next;
            consumed = next;

            if self.pending.len() >= LINES_BUFFERED {
                self.flush(sink);
            }
            if self.limit_reached() {
                self.flush(sink);
                return Ok((ScanEnd::LimitReached, next));
            }
        }

        Ok((ScanEnd::Completed, consumed))
    }
}
