//! Directory error types
//!
//! Connectivity faults are recoverable by skipping directory work. Integrity
//! faults (one filter matching several people) are never recoverable.

use thiserror::Error;

/// Result type alias using `DirectoryError`.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors raised by directory searches.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Could not open a connection to the directory.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The directory refused the bind.
    #[error("bind failed for {bind_dn} with code {code}: {message}")]
    BindFailed {
        bind_dn: String,
        code: u32,
        message: String,
    },

    /// A search request failed in transit or was rejected.
    #[error("search failed: {message}")]
    SearchFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A filter that must identify one person matched several entries.
    #[error("directory integrity fault: filter {filter} matched {count} entries")]
    MultipleEntries { filter: String, count: usize },

    /// Directory configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl DirectoryError {
    /// Whether the directory could not be reached or answered.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            DirectoryError::ConnectionFailed { .. }
                | DirectoryError::BindFailed { .. }
                | DirectoryError::SearchFailed { .. }
        )
    }

    /// Whether the directory holds ambiguous data for one filter.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, DirectoryError::MultipleEntries { .. })
    }

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with a source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a search failed error.
    pub fn search_failed(message: impl Into<String>) -> Self {
        DirectoryError::SearchFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a search failed error with a source.
    pub fn search_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::SearchFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
