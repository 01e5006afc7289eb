use thiserror::Error;

/// Errors surfaced by the format layer.
///
/// Per-record problems (truncated lines, impossible offsets, bad digits)
/// are not errors: the parser reports them as `None` and the caller skips
/// the record. Only file-level conditions end up here.
#[derive(Debug, Error)]
pub enum CoreError {
    /// I/O error while opening or mapping a log file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No `#!#` schema header before the first data record
    #[error("log schema header (#!#) missing before first record")]
    MissingSchemaHeader,

    /// A `#!#` header was found but could not be parsed
    #[error("malformed log schema header: {line:?}")]
    BadSchemaHeader { line: String },
}

/// A specialized Result type for format-layer operations
pub type Result<T> = std::result::Result<T, CoreError>;
