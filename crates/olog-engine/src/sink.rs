//! The host interface of a run.

/// One delivered row: the display line plus the item-list anchors that
/// let the host re-open the record later.
#[derive(Debug, Clone)]
pub struct RowEntry {
    pub text: String,
    /// Rotation number of the log file the record came from
    pub file_number: u32,
    pub line_offset: u64,
    pub data_offset: u64,
    pub archived: bool,
}

/// A flushed batch of matched rows, in delivery order.
#[derive(Debug, Clone)]
pub struct Batch {
    pub rows: Vec<RowEntry>,
}

/// Callbacks the engine drives during a run.
///
/// `on_batch` delivers matched rows, `on_summary` the running one-line
/// summary after each flush, `on_status` progress and terminal status
/// lines, `on_fatal` the single message emitted before a fatal return.
pub trait EventSink {
    fn on_batch(&mut self, batch: Batch);
    fn on_summary(&mut self, summary: &str);
    fn on_status(&mut self, status: &str);
    fn on_fatal(&mut self, message: &str);
}
