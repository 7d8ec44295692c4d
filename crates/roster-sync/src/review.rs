//! Pull-request review of registry handle lists.

use std::collections::BTreeSet;

use roster_connector_github::ReviewEvent;
use roster_core::remove_domain_name;
use tracing::{info, instrument};

use crate::error::{SyncError, SyncResult};
use crate::reconcile::ReconciliationService;

/// Verdict on one pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub event: ReviewEvent,
    /// Handles listed in the file, normalized, in file order.
    pub handles: Vec<String>,
    /// Handles no member record links.
    pub unknown: Vec<String>,
    pub body: String,
    /// Whether the review was sent to the platform.
    pub posted: bool,
}

/// Handles listed one per line. Blank lines and `#` comments are skipped;
/// repeated handles are kept once.
pub fn parse_handles(content: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(remove_domain_name)
        .filter(|handle| !handle.is_empty() && seen.insert(handle.to_lowercase()))
        .collect()
}

fn review_body(unknown: &[String]) -> String {
    if unknown.is_empty() {
        return "Every listed account belongs to a known organization member.".to_string();
    }
    let mut body =
        String::from("These accounts are not linked to any known organization member:\n\n");
    for handle in unknown {
        body.push_str(&format!("- `{handle}`\n"));
    }
    body
}

impl ReconciliationService {
    /// Review the handle list changed by the configured pull request.
    #[instrument(skip(self))]
    pub async fn review_pull_request(&self) -> SyncResult<ReviewOutcome> {
        let review = &self.config().review;
        let (Some(repo), Some(pull_number), Some(path)) =
            (&review.repository, review.pull_number, &review.path)
        else {
            return Err(SyncError::Configuration(
                "review.repository, review.pull_number and review.path are required".to_string(),
            ));
        };
        let git_ref = review
            .git_ref
            .clone()
            .unwrap_or_else(|| format!("refs/pull/{pull_number}/head"));

        let content = self
            .platform()
            .get_file_content(repo, path, &git_ref)
            .await?;
        let handles = parse_handles(&content);

        let stores = &self.config().stores;
        let confirmed = self.load(&stores.directory_confirmed)?.to_secondary_keyed();
        let supplementary = self.load(&stores.supplementary)?.to_secondary_keyed();
        let unknown: Vec<String> = handles
            .iter()
            .filter(|h| !confirmed.contains_key(h) && !supplementary.contains_key(h))
            .cloned()
            .collect();

        let event = if unknown.is_empty() {
            ReviewEvent::Approve
        } else {
            ReviewEvent::RequestChanges
        };
        let body = review_body(&unknown);

        let posted = if self.config().options.dry_run {
            info!(event = event.as_str(), body = %body, "Dry run, review not posted");
            false
        } else {
            self.platform()
                .create_review(repo, pull_number, &body, event)
                .await?;
            info!(repo = %repo, pull_number, event = event.as_str(), "Posted review");
            true
        };

        Ok(ReviewOutcome {
            event,
            handles,
            unknown,
            body,
            posted,
        })
    }
}
