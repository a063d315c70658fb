//! # Artifact Errors
//!
//! "Not found" is never an error for metadata reads: a missing
//! `BUILD-INFO.txt` or header file is `Ok(None)`. [`StorageError`] is
//! reserved for infrastructure failures.

use thiserror::Error;

/// Object-storage failure other than "no such key".
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    #[error("object store unavailable: {0}")]
    Unavailable(String),

    #[error("object store error for {key}: {message}")]
    Backend { key: String, message: String },

    #[error("object store {operation} timed out after {seconds}s")]
    Timeout { operation: &'static str, seconds: u64 },
}

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("no such artifact: {0}")]
    NotFound(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// A child name that is not a single plain path component.
    #[error("invalid child name: {0:?}")]
    InvalidName(String),

    #[error("multiple files match {0}")]
    AmbiguousWildcard(String),

    /// A symlink resolves outside the served directory.
    #[error("{0} resolves outside the served directory")]
    OutsideRoot(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ArtifactError {
    /// True for errors that mean "serve a 404".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::InvalidName(_) | Self::AmbiguousWildcard(_)
        )
    }
}
