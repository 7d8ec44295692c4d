//! Run phases and the per-run report.

use std::fmt;

use crate::issues::IssueReport;

/// Reconciliation phases, in execution order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    #[default]
    Fetching,
    Pruning,
    Validating,
    Resolving,
    Deleting,
    Persisting,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Fetching => "fetching",
            Phase::Pruning => "pruning",
            Phase::Validating => "validating",
            Phase::Resolving => "resolving",
            Phase::Deleting => "deleting",
            Phase::Persisting => "persisting",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// What one run changed. Usernames are listed as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Last phase entered.
    pub phase: Phase,
    /// Resolved into the directory-confirmed collection.
    pub added: Vec<String>,
    /// Moved from the supplementary to the directory-confirmed collection.
    pub promoted: Vec<String>,
    /// Directory-confirmed records whose data changed on re-validation.
    pub refreshed: Vec<String>,
    /// Records newly given a removal date.
    pub marked: Vec<String>,
    /// Records dropped because the account left the organization.
    pub pruned: Vec<String>,
    /// Records removed after their removal date passed.
    pub removed: Vec<String>,
    /// Organization members no directory lookup resolved.
    pub unresolved: Vec<String>,
    /// Directory work was skipped because the directory was unreachable.
    pub directory_skipped: bool,
    /// Report built by the issue-raising flow.
    pub issue: Option<IssueReport>,
    /// Issue created or commented on.
    pub posted_issue: Option<u64>,
}

impl RunReport {
    pub(crate) fn enter(&mut self, phase: Phase) {
        tracing::debug!(phase = %phase, "Entering phase");
        self.phase = phase;
    }
}
