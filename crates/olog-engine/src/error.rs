use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an engine run.
///
/// Everything else in the §7 taxonomy — missing files, per-file metadata
/// and mapping problems, parse anomalies, resolver misses — is recovered
/// locally and never reaches the host.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The log directory itself is unusable
    #[error("registry error: {0}")]
    Registry(#[from] olog_registry::RegistryError),

    /// Missing or malformed `#!#` schema header
    #[error("schema error: {0}")]
    Schema(#[from] olog_core::CoreError),

    /// Growth of the match buffer failed
    #[error("allocation failure: {0}")]
    Alloc(#[from] TryReserveError),

    /// I/O error on the current log while tailing it
    #[error("tail error on {}: {source}", .path.display())]
    TailIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A specialized Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
