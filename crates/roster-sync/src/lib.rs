//! # Roster Sync
//!
//! Reconciles the platform organization's membership with the corporate
//! directory.
//!
//! A [`ReconciliationService`] owns one run at a time. The sync flow keeps
//! the directory-confirmed and supplementary member stores current; the
//! issue-raising flow additionally guesses identities for unknown members,
//! removes records whose grace period ran out and posts a report issue. The
//! review flow checks registry handles listed in a pull request.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use roster_sync::{Flow, ReconciliationService, RosterConfig};
//!
//! let config = Arc::new(RosterConfig::load()?);
//! let service = ReconciliationService::new(config, platform, directory);
//! let report = service.run(Flow::Sync).await?;
//! ```

pub mod candidates;
pub mod config;
pub mod error;
pub mod guess;
pub mod issues;
pub mod reconcile;
pub mod report;
pub mod review;

// Re-exports
pub use candidates::{CandidateCollector, CandidateSource};
pub use config::{
    BotConfig, CorporateConfig, IssueConfig, LoggingConfig, ReviewConfig, RosterConfig, RunMode,
    StoreConfig, SyncOptions,
};
pub use error::{SyncError, SyncResult};
pub use guess::{GuessOutcome, GuessStrategy};
pub use issues::{IssueRenderer, IssueReport, PlainIssueRenderer, RenderedIssue};
pub use reconcile::{Flow, ReconciliationService};
pub use report::{Phase, RunReport};
pub use review::{parse_handles, ReviewOutcome};
