//! Sink error types

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result type for sink operations
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors surfaced by the sink
#[derive(Debug, Error)]
pub enum SinkError {
    /// File operation failed
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// File or directory involved
        path: String,
        #[source]
        source: io::Error,
    },

    /// Configuration rejected at construction
    #[error("invalid writer config: {0}")]
    Config(String),

    /// Write attempted after `close()`
    #[error("writer is closed")]
    Closed,

    /// Buffered mode needs a tokio runtime for the flush task
    #[error("no tokio runtime available to run the flush task")]
    NoRuntime,
}

impl SinkError {
    /// Create an I/O error with path context
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<SinkError> for io::Error {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::Io { source, .. } => source,
            SinkError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, SinkError::Closed),
            other => io::Error::other(other),
        }
    }
}
