//! Error types for fieldsync.

use std::time::Duration;

use thiserror::Error;

/// Error type produced by a caller-supplied commit handler.
pub type CommitError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected by the caller-supplied validator. Never reaches the
    /// commit handler.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The commit handler returned an error.
    #[error("commit failed: {0}")]
    Commit(#[source] CommitError),

    /// The commit handler exceeded the configured deadline. The handler
    /// itself is not cancelled; its eventual outcome is discarded.
    #[error("commit timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
