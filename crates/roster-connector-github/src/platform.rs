//! Platform operations used by reconciliation.

use std::sync::Arc;

use async_trait::async_trait;
use roster_core::{AccountKind, AccountResolver, BoxError};

use crate::error::GithubResult;
use crate::models::{GithubUser, Issue, Repository, ReviewEvent, Team};

/// Read and write operations against the code-collaboration platform.
///
/// Repository arguments are `owner/name`.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Logins of every organization member.
    async fn list_org_members(&self, org: &str) -> GithubResult<Vec<String>>;

    async fn list_teams(&self, org: &str) -> GithubResult<Vec<Team>>;

    /// Logins of the members of one team.
    async fn list_team_members(&self, org: &str, team_slug: &str) -> GithubResult<Vec<String>>;

    async fn list_repositories(&self, org: &str) -> GithubResult<Vec<Repository>>;

    /// Logins of a repository's collaborators.
    async fn list_repository_collaborators(&self, repo: &str) -> GithubResult<Vec<String>>;

    /// Profile of `login`, or `None` when the account does not exist.
    async fn get_user(&self, login: &str) -> GithubResult<Option<GithubUser>>;

    /// What `handle` points at. Handles containing `/` are looked up as
    /// repositories.
    async fn resolve_account(&self, handle: &str) -> GithubResult<Option<AccountKind>>;

    /// Decoded content of the file at `path` on `git_ref`.
    async fn get_file_content(&self, repo: &str, path: &str, git_ref: &str)
        -> GithubResult<String>;

    /// First open issue carrying `label`.
    async fn find_open_issue(&self, repo: &str, label: &str) -> GithubResult<Option<Issue>>;

    async fn create_issue(&self, repo: &str, title: &str, body: &str) -> GithubResult<Issue>;

    async fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> GithubResult<()>;

    async fn comment_issue(&self, repo: &str, number: u64, body: &str) -> GithubResult<()>;

    async fn create_review(
        &self,
        repo: &str,
        pull_number: u64,
        body: &str,
        event: ReviewEvent,
    ) -> GithubResult<()>;
}

/// Exposes a platform client as a linked-account resolver.
#[derive(Clone)]
pub struct PlatformResolver {
    platform: Arc<dyn PlatformClient>,
}

impl PlatformResolver {
    pub fn new(platform: Arc<dyn PlatformClient>) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl AccountResolver for PlatformResolver {
    async fn resolve_account(&self, handle: &str) -> Result<Option<AccountKind>, BoxError> {
        Ok(self.platform.resolve_account(handle).await?)
    }
}
