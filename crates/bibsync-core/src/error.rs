//! Error types for bibsync-core
//!
//! Only the file-level workflows fail; the matching engine itself is total.

use std::path::PathBuf;

use bibsync_bibtex::ParseError;
use thiserror::Error;

/// Result type alias for bibsync operations
pub type Result<T> = std::result::Result<T, BibSyncError>;

#[derive(Error, Debug)]
pub enum BibSyncError {
    /// Reading or writing a file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A bibliography file could not be read as BibTeX
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// Invalid configuration file
    #[error("configuration error: {0}")]
    Config(String),

    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

impl BibSyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BibSyncError::Io {
            path: path.into(),
            source,
        }
    }
}
