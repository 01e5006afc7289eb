//! Running totals of one run.

use crate::row::format_size_u64;
use chrono::{Local, TimeZone};
use olog_core::FileSize;
use serde::{Deserialize, Serialize};

/// Mutable counters of one run, reset at every (re)start.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    pub total_matched: u64,
    /// Saturating byte total
    pub total_bytes: u64,
    pub total_trans_time: f64,
    /// Timestamp of the earliest matched record, seeded by the first match
    pub first_ts: Option<u64>,
    /// Timestamp of the latest matched record
    pub last_ts: Option<u64>,
    pub unprintable_chars: u64,
    /// Records skipped as parse anomalies
    pub ignored: u64,
}

impl SessionState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn note_match(&mut self, ts: u64, size: FileSize, transport_time: f64) {
        self.total_matched += 1;
        self.total_bytes = self.total_bytes.saturating_add(size.saturating_value());
        self.total_trans_time += transport_time;

        match self.first_ts {
            None => self.first_ts = Some(ts),
            Some(first) if ts < first => self.first_ts = Some(ts),
            Some(_) => {}
        }
        match self.last_ts {
            None => self.last_ts = Some(ts),
            Some(last) if ts > last => self.last_ts = Some(ts),
            Some(_) => {}
        }
    }

    fn format_ts(ts: u64) -> String {
        match Local.timestamp_opt(ts as i64, 0).single() {
            Some(dt) => dt.format("%d.%m.%Y %H:%M:%S").to_string(),
            None => "??.??.???? ??:??:??".to_string(),
        }
    }

    /// The one-line summary re-emitted on every flush.
    pub fn summary_line(&self) -> String {
        let range = match (self.first_ts, self.last_ts) {
            (Some(first), Some(last)) => {
                format!("  {} - {}", Self::format_ts(first), Self::format_ts(last))
            }
            _ => String::new(),
        };

        format!(
            "{} files  {}  {:.2}s{}",
            self.total_matched,
            format_size_u64(self.total_bytes),
            self.total_trans_time,
            range
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_accumulate() {
        let mut state = SessionState::default();
        state.note_match(100, FileSize::Bytes(1024), 0.5);
        state.note_match(90, FileSize::Bytes(512), 0.25);
        state.note_match(110, FileSize::Bytes(512), 0.25);

        assert_eq!(state.total_matched, 3);
        assert_eq!(state.total_bytes, 2048);
        assert!((state.total_trans_time - 1.0).abs() < 1e-9);
        assert_eq!(state.first_ts, Some(90));
        assert_eq!(state.last_ts, Some(110));

        let line = state.summary_line();
        assert!(line.starts_with("3 files  2.0K  1.00s"));
    }

    #[test]
    fn infinite_size_saturates_totals() {
        let mut state = SessionState::default();
        state.note_match(1, FileSize::Infinite, 0.0);
        state.note_match(2, FileSize::Bytes(1), 0.0);
        assert_eq!(state.total_bytes, u64::MAX);
    }

    #[test]
    fn empty_summary_has_no_range() {
        let state = SessionState::default();
        assert_eq!(state.summary_line(), "0 files  0  0.00s");
    }
}
