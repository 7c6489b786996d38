//! Error types for ccmirror-sync.

use std::path::PathBuf;

use thiserror::Error;

/// Filesystem errors raised while discovering, moving or logging files.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a request file could not be turned into change requests.
///
/// Always scoped to a single file: the file is routed to KO and the batch
/// moves on.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid record at line {line} of {path}: {message}")]
    Record {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("invalid decoder configuration: {0}")]
    Config(String),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
