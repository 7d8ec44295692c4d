//! Reconciliation error types.

use roster_connector_github::GithubError;
use roster_connector_ldap::DirectoryError;
use roster_connector_quay::QuayError;
use roster_core::RosterError;
use thiserror::Error;

/// Result type alias using `SyncError`.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a reconciliation run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Invalid or incomplete configuration. Raised before any work starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The directory could not be reached and the run is strict about it.
    #[error("Directory unavailable: {0}")]
    DirectoryUnavailable(#[source] DirectoryError),

    /// Directory fault other than connectivity, including integrity faults.
    #[error("Directory error: {0}")]
    Directory(#[source] DirectoryError),

    /// Member store fault.
    #[error("Store error: {0}")]
    Store(#[from] RosterError),

    /// Platform API fault.
    #[error("Platform error: {0}")]
    Platform(#[from] GithubError),

    /// Registry client fault.
    #[error("Registry error: {0}")]
    Registry(#[from] QuayError),

    /// A fan-out task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(String),
}

impl From<DirectoryError> for SyncError {
    fn from(e: DirectoryError) -> Self {
        if e.is_connectivity() {
            SyncError::DirectoryUnavailable(e)
        } else {
            SyncError::Directory(e)
        }
    }
}

impl SyncError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::Configuration(_) => 2,
            SyncError::DirectoryUnavailable(_) => 3,
            SyncError::Directory(e) if e.is_integrity_fault() => 4,
            SyncError::Directory(DirectoryError::InvalidConfiguration { .. }) => 2,
            SyncError::Platform(_) | SyncError::Registry(_) => 5,
            SyncError::Directory(_) | SyncError::Store(_) | SyncError::Task(_) => 1,
        }
    }

    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, SyncError::Directory(e) if e.is_integrity_fault())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(SyncError::Configuration("x".into()).exit_code(), 2);
        assert_eq!(
            SyncError::from(DirectoryError::connection_failed("down")).exit_code(),
            3
        );

        let integrity = SyncError::from(DirectoryError::MultipleEntries {
            filter: "(uid=a)".into(),
            count: 2,
        });
        assert!(integrity.is_integrity_fault());
        assert_eq!(integrity.exit_code(), 4);

        assert_eq!(
            SyncError::from(GithubError::NotFound("/orgs/x".into())).exit_code(),
            5
        );
        assert_eq!(
            SyncError::from(RosterError::MissingStore {
                path: "ldap.csv".into()
            })
            .exit_code(),
            1
        );
    }
}
