//! Candidate collection
//!
//! Lists the members of every candidate source concurrently, skips the ones
//! already known and guesses an identity for the rest. Each task owns its
//! directory session and its result map; maps are merged afterwards in
//! source order.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use roster_connector_github::PlatformClient;
use roster_connector_ldap::DirectoryConnector;
use roster_core::{Member, Source};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::CorporateConfig;
use crate::error::{SyncError, SyncResult};
use crate::guess::{self, GuessOutcome};

/// Where candidate accounts come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    /// Every organization member.
    Organization(String),
    /// Members of one team.
    Team { org: String, slug: String },
    /// Collaborators of one repository (`owner/name`).
    Repository(String),
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateSource::Organization(org) => write!(f, "org:{org}"),
            CandidateSource::Team { org, slug } => write!(f, "team:{org}/{slug}"),
            CandidateSource::Repository(repo) => write!(f, "repo:{repo}"),
        }
    }
}

impl CandidateSource {
    async fn list(&self, platform: &dyn PlatformClient) -> SyncResult<Vec<String>> {
        let logins = match self {
            CandidateSource::Organization(org) => platform.list_org_members(org).await?,
            CandidateSource::Team { org, slug } => platform.list_team_members(org, slug).await?,
            CandidateSource::Repository(repo) => {
                platform.list_repository_collaborators(repo).await?
            }
        };
        Ok(logins)
    }
}

/// Runs the per-source fan-out.
#[derive(Clone)]
pub struct CandidateCollector {
    platform: Arc<dyn PlatformClient>,
    /// `None` when the directory is unreachable: members are classified
    /// from their profile alone.
    directory: Option<Arc<dyn DirectoryConnector>>,
    corporate: Arc<CorporateConfig>,
    concurrency: usize,
}

impl CandidateCollector {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        directory: Option<Arc<dyn DirectoryConnector>>,
        corporate: Arc<CorporateConfig>,
        concurrency: usize,
    ) -> Self {
        Self {
            platform,
            directory,
            corporate,
            concurrency: concurrency.max(1),
        }
    }

    /// Guess every unknown account across `sources`, keyed by lowercase
    /// username.
    ///
    /// `known` holds lowercase usernames already present in either member
    /// collection; it is only read.
    pub async fn collect(
        &self,
        sources: Vec<CandidateSource>,
        known: Arc<HashSet<String>>,
    ) -> SyncResult<BTreeMap<String, GuessOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for (index, source) in sources.into_iter().enumerate() {
            let collector = self.clone();
            let known = Arc::clone(&known);
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| SyncError::Task(e.to_string()))?;
                let found = collector.collect_source(&source, &known).await?;
                Ok::<_, SyncError>((index, found))
            });
        }

        let mut per_source = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            let result = joined.map_err(|e| SyncError::Task(e.to_string()))?;
            per_source.push(result?);
        }

        per_source.sort_by_key(|(index, _)| *index);
        let mut merged = BTreeMap::new();
        for (_, found) in per_source {
            merged.extend(found);
        }

        info!(candidates = merged.len(), "Collected unknown members");
        Ok(merged)
    }

    async fn collect_source(
        &self,
        source: &CandidateSource,
        known: &HashSet<String>,
    ) -> SyncResult<BTreeMap<String, GuessOutcome>> {
        let logins = source.list(self.platform.as_ref()).await?;
        let unknown: Vec<String> = logins
            .into_iter()
            .filter(|login| !known.contains(&login.to_lowercase()))
            .collect();
        debug!(source = %source, unknown = unknown.len(), "Listed candidate source");

        let mut found = BTreeMap::new();
        if unknown.is_empty() {
            return Ok(found);
        }

        let mut client = match &self.directory {
            Some(directory) => Some(directory.open().await?),
            None => None,
        };

        for login in unknown {
            let Some(user) = self.platform.get_user(&login).await? else {
                warn!(username = %login, source = %source, "Listed account has no profile, skipping");
                continue;
            };
            let member = Member::new(&login, Source::Automated)?.with_profile(user.to_profile());

            let outcome = match client.as_mut() {
                Some(client) => guess::attempt(client, &self.corporate, member).await?,
                None => guess::classify_unmatched(&self.corporate, member),
            };
            found.insert(login.to_lowercase(), outcome);
        }

        if let Some(client) = client {
            if let Err(e) = client.close().await {
                warn!(error = %e, source = %source, "Failed to close directory session");
            }
        }
        Ok(found)
    }
}
