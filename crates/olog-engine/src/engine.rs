//! The orchestrator: drives one query end-to-end.
//!
//! Prepare state, select the window-overlapping files, scan them
//! newest-first from the time-index entry point, flush batches, then
//! either finish with a status line or install the live tail on the
//! current log. A rotation observed while tailing drains the old
//! descriptor and restarts the whole query as a new session.

use crate::error::{EngineError, Result};
use crate::items::ItemList;
use crate::query::Query;
use crate::resolve::Resolver;
use crate::scan::{ScanEnd, Scanner};
use crate::sink::EventSink;
use crate::summary::SessionState;
use crate::tail::{TailEvent, TailState};
use olog_core::{LogSchema, MappedLog, first_record_at};
use olog_registry::FileSet;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Poll cadence of the live tail.
pub const LOG_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Default bound on the rotation chain.
pub const MAX_OUTPUT_LOG_FILES: u32 = 10;

/// Engine configuration: where the logs live and how the tail polls.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub directory: PathBuf,
    pub base_name: String,
    pub max_files: u32,
    pub poll_interval: Duration,
}

impl EngineConfig {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            base_name: "OUTPUT_LOG".to_string(),
            max_files: MAX_OUTPUT_LOG_FILES,
            poll_interval: LOG_CHECK_INTERVAL,
        }
    }

    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = base_name.into();
        self
    }

    pub fn with_max_files(mut self, max_files: u32) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// What a run leaves behind for the viewing session: the item lists for
/// row re-fetching and the final counters.
#[derive(Debug)]
pub struct RunOutput {
    pub item_lists: Vec<ItemList>,
    pub state: SessionState,
}

/// Tail handover from the initial scan of the current log.
struct TailSeed {
    consumed: u64,
    inode: u64,
    schema: Option<LogSchema>,
}

/// The output-log search engine.
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one query to completion.
    ///
    /// Cancellation is cooperative and clean: the pending batch is
    /// flushed and the terminal summary emitted, and the call returns
    /// `Ok`. Only schema errors, allocation failure and tail I/O on the
    /// current log are fatal; those emit one `on_fatal` and return `Err`.
    pub async fn run(
        &self,
        query: &Query,
        resolver: &mut dyn Resolver,
        sink: &mut dyn EventSink,
        cancel: CancellationToken,
    ) -> Result<RunOutput> {
        let result = self.run_inner(query, resolver, sink, &cancel).await;
        resolver.release();

        match result {
            Ok(output) => Ok(output),
            Err(e) => {
                sink.on_fatal(&e.to_string());
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        query: &Query,
        resolver: &mut dyn Resolver,
        sink: &mut dyn EventSink,
        cancel: &CancellationToken,
    ) -> Result<RunOutput> {
        let started = Instant::now();
        let mut waited = false;

        let file_set = FileSet::new(
            &self.config.directory,
            &self.config.base_name,
            self.config.max_files,
        );

        'session: loop {
            let now = epoch_now();
            let mut scanner = Scanner::new(query, now);

            let files = file_set.select_window(query.start_time, query.end_time)?;
            debug!(files = files.len(), "Selected log files for window");

            let mut outcome = ScanEnd::Completed;
            let mut tail_seed: Option<TailSeed> = None;

            for file in &files {
                if cancel.is_cancelled() {
                    outcome = ScanEnd::Cancelled;
                    break;
                }

                let mapped = match MappedLog::open(&file.path) {
                    Ok(mapped) => mapped,
                    Err(e) => {
                        warn!(
                            file = %file.path.display(),
                            error = %e,
                            "Cannot map log file; skipping"
                        );
                        continue;
                    }
                };

                if mapped.is_empty() {
                    if file.number == 0 {
                        tail_seed = Some(TailSeed {
                            consumed: 0,
                            inode: mapped.inode(),
                            schema: None,
                        });
                    }
                    continue;
                }

                let buf = mapped.bytes();
                let schema = LogSchema::parse_header(buf)?;
                let start_at = first_record_at(buf, &schema, query.start_time);

                let (end, consumed) = scanner.scan_buffer(
                    buf,
                    0,
                    &schema,
                    file.number,
                    start_at,
                    resolver,
                    sink,
                    cancel,
                )?;
                scanner.flush(sink);

                if file.number == 0 {
                    tail_seed = Some(TailSeed {
                        consumed: consumed as u64,
                        inode: mapped.inode(),
                        schema: Some(schema),
                    });
                }

                match end {
                    ScanEnd::Completed | ScanEnd::PastWindow => {
                        if end == ScanEnd::PastWindow {
                            outcome = ScanEnd::PastWindow;
                        }
                    }
                    ScanEnd::LimitReached => {
                        sink.on_status(&format!("List limit ({}) reached!", query.list_limit));
                        outcome = ScanEnd::LimitReached;
                        break;
                    }
                    ScanEnd::Cancelled => {
                        outcome = ScanEnd::Cancelled;
                        break;
                    }
                }
            }

            let tail_wanted = outcome == ScanEnd::Completed
                && !cancel.is_cancelled()
                && match query.end_time {
                    None => true,
                    Some(end) => end > epoch_now(),
                };

            if !tail_wanted {
                return Ok(self.finish(scanner, sink, started, waited));
            }

            // Live tail on the current log.
            waited = true;
            let current_path = self
                .config
                .directory
                .join(format!("{}.0", self.config.base_name));
            let seed = tail_seed.unwrap_or(TailSeed {
                consumed: 0,
                inode: 0,
                schema: None,
            });
            let mut schema = seed.schema;

            let tail = TailState::attach(current_path.clone(), seed.inode, seed.consumed)
                .map_err(|e| EngineError::TailIo {
                    path: current_path.clone(),
                    source: e,
                })?;
            let Some(mut tail) = tail else {
                // Rotated between scan and attach: rescan everything.
                info!("Log rotated before tail attach; restarting search");
                sink.on_status("Log rotated. Restarting search.");
                continue 'session;
            };

            let mut interval = tokio::time::interval(self.config.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Ok(self.finish(scanner, sink, started, waited));
                    }
                    _ = interval.tick() => {}
                }

                if let Some(end) = query.end_time {
                    if epoch_now() > end {
                        return Ok(self.finish(scanner, sink, started, waited));
                    }
                }

                let event = tail.poll().map_err(|e| EngineError::TailIo {
                    path: current_path.clone(),
                    source: e,
                })?;

                match event {
                    TailEvent::Quiet => {}
                    TailEvent::Grown { base, data } => {
                        if schema.is_none() {
                            // A fresh current file: its delta starts with
                            // the inherited header block.
                            schema = Some(LogSchema::parse_header(&data)?);
                        }
                        let Some(schema_ref) = schema.as_ref() else {
                            continue;
                        };

                        let (end, _) = scanner.scan_buffer(
                            &data, base, schema_ref, 0, 0, resolver, sink, cancel,
                        )?;
                        scanner.flush(sink);

                        match end {
                            ScanEnd::Completed => {}
                            ScanEnd::LimitReached => {
                                sink.on_status(&format!(
                                    "List limit ({}) reached!",
                                    query.list_limit
                                ));
                                return Ok(self.finish(scanner, sink, started, waited));
                            }
                            ScanEnd::PastWindow | ScanEnd::Cancelled => {
                                return Ok(self.finish(scanner, sink, started, waited));
                            }
                        }
                    }
                    TailEvent::Rotated { remainder } => {
                        if let (Some((base, data)), Some(schema_ref)) = (remainder, &schema) {
                            let (end, _) = scanner.scan_buffer(
                                &data, base, schema_ref, 0, 0, resolver, sink, cancel,
                            )?;
                            scanner.flush(sink);

                            if end == ScanEnd::LimitReached {
                                sink.on_status(&format!(
                                    "List limit ({}) reached!",
                                    query.list_limit
                                ));
                                return Ok(self.finish(scanner, sink, started, waited));
                            }
                            if end == ScanEnd::Cancelled {
                                return Ok(self.finish(scanner, sink, started, waited));
                            }
                        }

                        info!("Log rotated; restarting search");
                        sink.on_status("Log rotated. Restarting search.");
                        continue 'session;
                    }
                }
            }
        }
    }

    fn finish(
        &self,
        mut scanner: Scanner<'_>,
        sink: &mut dyn EventSink,
        started: Instant,
        waited: bool,
    ) -> RunOutput {
        scanner.flush(sink);
        sink.on_summary(&scanner.state.summary_line());
        sink.on_status(&final_status(&scanner.state, started, waited));

        RunOutput {
            item_lists: std::mem::take(&mut scanner.items),
            state: scanner.state,
        }
    }
}

fn epoch_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn final_status(state: &SessionState, started: Instant, waited: bool) -> String {
    let mut status = if state.total_matched == 0 {
        "No data found".to_string()
    } else if waited {
        let elapsed = started.elapsed().as_secs();
        format!(
            "Search+Wait time: {}h {}m {}s",
            elapsed / 3600,
            (elapsed % 3600) / 60,
            elapsed % 60
        )
    } else {
        format!("Search time: {}s", started.elapsed().as_secs())
    };

    if state.unprintable_chars > 0 {
        status.push_str(&format!(" ({} unprintable chars!)", state.unprintable_chars));
    }
    status
}
