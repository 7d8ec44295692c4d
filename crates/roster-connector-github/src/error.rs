//! Error types for the platform client.

use thiserror::Error;

/// Result type alias using `GithubError`.
pub type GithubResult<T> = Result<T, GithubError>;

/// Errors that can occur when talking to the platform API.
#[derive(Debug, Error)]
pub enum GithubError {
    /// Configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The API answered with a non-success status.
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// File content could not be decoded.
    #[error("Content decode error: {0}")]
    Decode(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GithubError {
    /// HTTP status of an API error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            GithubError::Api { status, .. } => Some(*status),
            GithubError::NotFound(_) => Some(404),
            GithubError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
