//! The output-log search, tail and listing engine.
//!
//! Given a [`Query`], a resolver for job metadata and an [`EventSink`],
//! the engine selects the rotated log files that overlap the query's time
//! window, scans them newest-first from a timestamp-indexed entry point,
//! evaluates the composed filter predicate against every record, and
//! delivers display rows in batches together with the byte offsets a
//! viewing session needs to re-open each record. With an open-ended
//! window it then follows the current log live, restarting the query when
//! the log rotates underneath it.
//!
//! The engine is single-threaded and cooperative: it suspends between
//! batch flushes and at every tail poll, and a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) is observed
//! at those points plus every few hundred records mid-scan.
//!
//! # Example
//!
//! ```no_run
//! use olog_engine::{Engine, EngineConfig, NullResolver, Query};
//! use olog_engine::sink::{Batch, EventSink};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Stdout;
//!
//! impl EventSink for Stdout {
//!     fn on_batch(&mut self, batch: Batch) {
//!         for row in batch.rows {
//!             println!("{}", row.text);
//!         }
//!     }
//!     fn on_summary(&mut self, summary: &str) {
//!         eprintln!("{summary}");
//!     }
//!     fn on_status(&mut self, status: &str) {
//!         eprintln!("{status}");
//!     }
//!     fn on_fatal(&mut self, message: &str) {
//!         eprintln!("fatal: {message}");
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::new(EngineConfig::new("/var/spool/afd/log"));
//! let query = Query::new(1_700_000_000).with_end_time(1_700_100_000);
//!
//! let output = engine
//!     .run(&query, &mut NullResolver, &mut Stdout, CancellationToken::new())
//!     .await?;
//! println!("{} rows indexed", output.state.total_matched);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod filter;
pub mod items;
pub mod query;
pub mod resolve;
pub mod row;
pub mod sink;
pub mod summary;

mod scan;
mod tail;

pub use engine::{Engine, EngineConfig, LOG_CHECK_INTERVAL, MAX_OUTPUT_LOG_FILES, RunOutput};
pub use error::{EngineError, Result};
pub use items::{ItemEntry, ItemList, LINES_BUFFERED};
pub use query::{FileNamePreference, ProtocolSet, Query, SizeFilter, TransportTimeFilter};
pub use resolve::{DirInfo, MapResolver, NullResolver, Resolver, UserInfo};
pub use sink::{Batch, EventSink, RowEntry};
pub use summary::SessionState;
