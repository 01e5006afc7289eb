use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while scanning a log directory.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// I/O error when reading the log directory itself
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured log directory is not a directory
    #[error("Not a directory: {}", .path.display())]
    NotADirectory { path: PathBuf },
}

/// A specialized Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
