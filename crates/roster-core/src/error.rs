//! Roster error types
//!
//! Errors raised by member records, collections and the CSV store.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using `RosterError`.
pub type RosterResult<T> = Result<T, RosterError>;

/// Boxed error returned by validation collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while handling member records.
#[derive(Debug, Error)]
pub enum RosterError {
    /// A member record was built without a platform username.
    #[error("member record has an empty platform username")]
    EmptyUsername,

    /// `replace` was called for a member the collection does not hold.
    #[error("member '{username}' is not present in {path}")]
    MissingKey { username: String, path: PathBuf },

    /// A required store file does not exist.
    #[error("member store not found: {path}")]
    MissingStore { path: PathBuf },

    /// The store header does not carry a required column.
    #[error("member store {path} is missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    /// A store row could not be turned into a member record.
    #[error("invalid row {line} in {path}: {message}")]
    InvalidRow {
        path: PathBuf,
        line: u64,
        message: String,
    },

    /// CSV encoding or decoding failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RosterError {
    /// Create an invalid row error.
    pub fn invalid_row(path: impl Into<PathBuf>, line: u64, message: impl Into<String>) -> Self {
        Self::InvalidRow {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Check whether this error means the store is absent rather than broken.
    pub fn is_missing_store(&self) -> bool {
        matches!(self, RosterError::MissingStore { .. })
    }
}
