//! Reconciliation service
//!
//! One run moves through fetching, pruning, validating, resolving, deleting
//! and persisting. Both member collections are mutated only here, on the
//! orchestrating task. Directory stages compute their changes first and
//! apply them afterwards, so a failed stage leaves the collections as they
//! were.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use roster_connector_github::{PlatformClient, PlatformResolver};
use roster_connector_ldap::{
    DirectoryConnector, DirectoryError, DirectorySearchClient, Filter, MatchMode, SocialService,
};
use roster_core::{
    store, Member, MemberCollection, SecondaryAccountChecker, Source, Validators,
};
use tracing::{debug, info, instrument, warn};

use crate::candidates::{CandidateCollector, CandidateSource};
use crate::config::RosterConfig;
use crate::error::{SyncError, SyncResult};
use crate::guess::GuessOutcome;
use crate::issues::{IssueRenderer, IssueReport, PlainIssueRenderer};
use crate::report::{Phase, RunReport};

/// Which flow a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep both member stores in step with the organization.
    Sync,
    /// Sync, then remove expired records and report unknown members.
    RaiseIssues,
}

/// Changes computed for the directory-confirmed collection.
#[derive(Debug, Default)]
struct ConfirmedChanges {
    found: Vec<Member>,
    changed: Vec<String>,
    marked: Vec<Member>,
}

/// Changes computed for the supplementary collection.
#[derive(Debug, Default)]
struct SupplementaryChanges {
    promoted: Vec<Member>,
    marked: Vec<Member>,
}

/// Orchestrates reconciliation runs.
pub struct ReconciliationService {
    config: Arc<RosterConfig>,
    platform: Arc<dyn PlatformClient>,
    directory: Arc<dyn DirectoryConnector>,
    validators: Validators,
    renderer: Arc<dyn IssueRenderer>,
}

impl ReconciliationService {
    /// Linked platform accounts are validated against `platform`.
    pub fn new(
        config: Arc<RosterConfig>,
        platform: Arc<dyn PlatformClient>,
        directory: Arc<dyn DirectoryConnector>,
    ) -> Self {
        let validators = Validators::none()
            .with_platform(Arc::new(PlatformResolver::new(Arc::clone(&platform))));
        Self {
            config,
            platform,
            directory,
            validators,
            renderer: Arc::new(PlainIssueRenderer),
        }
    }

    /// Also validate linked registry accounts.
    #[must_use]
    pub fn with_secondary_checker(mut self, checker: Arc<dyn SecondaryAccountChecker>) -> Self {
        self.validators = self.validators.with_secondary(checker);
        self
    }

    #[must_use]
    pub fn with_validators(mut self, validators: Validators) -> Self {
        self.validators = validators;
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn IssueRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    pub(crate) fn platform(&self) -> &Arc<dyn PlatformClient> {
        &self.platform
    }

    /// Run once, dated today.
    pub async fn run(&self, flow: Flow) -> SyncResult<RunReport> {
        self.run_at(Utc::now().date_naive(), flow).await
    }

    /// Run once as if today were `today`.
    #[instrument(skip(self), fields(org = %self.config.organization))]
    pub async fn run_at(&self, today: NaiveDate, flow: Flow) -> SyncResult<RunReport> {
        let options = &self.config.options;
        let mut report = RunReport::default();

        if flow == Flow::RaiseIssues && !options.dry_run && self.config.issues.repository.is_none()
        {
            return Err(SyncError::Configuration(
                "issues.repository is required to raise issues outside dry-run".to_string(),
            ));
        }
        let deadline = today
            .checked_add_days(Days::new(u64::from(self.config.grace_period_days)))
            .ok_or_else(|| {
                SyncError::Configuration("grace_period_days is out of range".to_string())
            })?;

        report.enter(Phase::Fetching);
        let live = self
            .platform
            .list_org_members(&self.config.organization)
            .await?;
        let live_keys: HashSet<String> = live.iter().map(|l| l.to_lowercase()).collect();
        let mut confirmed = self.load(&self.config.stores.directory_confirmed)?;
        let mut supplementary = self.load(&self.config.stores.supplementary)?;
        let bot = self.bot_member()?;
        supplementary.ensure_present(bot.clone());
        info!(
            live = live.len(),
            confirmed = confirmed.len(),
            supplementary = supplementary.len(),
            "Fetched membership"
        );

        report.enter(Phase::Pruning);
        for collection in [&mut confirmed, &mut supplementary] {
            let departed = collection.filter(|m| {
                !m.is_marked_for_removal() && m.key() != bot.key() && !live_keys.contains(&m.key())
            });
            for member in collection.remove_all(&departed) {
                info!(username = %member.platform_username(), path = %collection.path().display(), "Pruned departed member");
                report.pruned.push(member.platform_username().to_string());
            }
        }

        let needs_directory = options.validate_directory
            || flow == Flow::RaiseIssues
            || live_keys
                .iter()
                .any(|k| !confirmed.contains_key(k) && !supplementary.contains_key(k));
        let mut directory = if needs_directory {
            self.open_directory().await?
        } else {
            None
        };

        if options.validate_directory {
            report.enter(Phase::Validating);
            if let Some(client) = directory.as_mut() {
                match self.validate_confirmed(client, &confirmed, deadline).await {
                    Ok(changes) => {
                        report.refreshed = changes.changed;
                        report.marked.extend(usernames(&changes.marked));
                        confirmed.replace(changes.found).await?;
                        confirmed.replace(changes.marked).await?;
                    }
                    Err(e) => {
                        self.tolerate(e)?;
                        directory = None;
                    }
                }
            }
            if let Some(client) = directory.as_mut() {
                match self
                    .validate_supplementary(client, &supplementary, &bot, deadline)
                    .await
                {
                    Ok(changes) => {
                        report.marked.extend(usernames(&changes.marked));
                        supplementary.replace(changes.marked).await?;
                        for member in changes.promoted {
                            info!(username = %member.platform_username(), "Promoting supplementary member");
                            report.promoted.push(member.platform_username().to_string());
                            supplementary.remove_member(&member);
                            confirmed.put(member).await;
                        }
                    }
                    Err(e) => {
                        self.tolerate(e)?;
                        directory = None;
                    }
                }
            }
        }

        report.enter(Phase::Resolving);
        let unknown: Vec<String> = live
            .iter()
            .filter(|l| !confirmed.contains_key(l) && !supplementary.contains_key(l))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        match directory.as_mut() {
            Some(client) => match self.resolve_unknown(client, &unknown).await {
                Ok((added, unresolved)) => {
                    for member in added {
                        info!(username = %member.platform_username(), email = ?member.directory_email(), "Resolved member");
                        report.added.push(member.platform_username().to_string());
                        confirmed.put(member).await;
                    }
                    report.unresolved = unresolved;
                }
                Err(e) => {
                    self.tolerate(e)?;
                    directory = None;
                    report.unresolved = unknown;
                }
            },
            None => report.unresolved = unknown,
        }

        let mut issue = None;
        if flow == Flow::RaiseIssues {
            let known: HashSet<String> = confirmed
                .keys()
                .chain(supplementary.keys())
                .map(str::to_string)
                .collect();
            let known = Arc::new(known);
            let sources = self.candidate_sources().await?;
            let outcomes = match self
                .collect_candidates(sources.clone(), directory.is_some(), Arc::clone(&known))
                .await
            {
                Err(e @ SyncError::DirectoryUnavailable(_)) => {
                    self.tolerate(e)?;
                    directory = None;
                    self.collect_candidates(sources, false, known).await?
                }
                other => other?,
            };

            let mut pending = IssueReport {
                organization: self.config.organization.clone(),
                ..IssueReport::default()
            };
            for outcome in outcomes.into_values() {
                match outcome {
                    GuessOutcome::Resolved { member, .. } => pending.guessed.push(member),
                    GuessOutcome::KnownEmployer(member) => pending.known_employer.push(member),
                    GuessOutcome::Unresolved(member) => pending.unknown.push(member),
                }
            }

            report.enter(Phase::Deleting);
            pending.removed.extend(confirmed.remove_expired(today));
            pending.removed.extend(supplementary.remove_expired(today));
            report.removed = usernames(&pending.removed);
            pending.sort();
            issue = Some(pending);
        }

        report.directory_skipped = needs_directory && directory.is_none();
        if let Some(client) = directory.take() {
            if let Err(e) = client.close().await {
                warn!(error = %e, "Failed to close directory session");
            }
        }

        report.enter(Phase::Persisting);
        if options.dry_run {
            info!("Dry run, member stores left untouched");
        } else {
            store::write_collection(&confirmed)?;
            store::write_collection(&supplementary)?;
        }

        if let Some(pending) = issue {
            report.posted_issue = self.post_issue(&pending).await?;
            report.issue = Some(pending);
        }

        report.enter(Phase::Done);
        info!(
            added = report.added.len(),
            promoted = report.promoted.len(),
            marked = report.marked.len(),
            pruned = report.pruned.len(),
            removed = report.removed.len(),
            unresolved = report.unresolved.len(),
            "Reconciliation complete"
        );
        Ok(report)
    }

    pub(crate) fn load(&self, path: &Path) -> SyncResult<MemberCollection> {
        let collection = if self.config.stores.create_missing {
            store::read_collection_or_empty(path)?
        } else {
            store::read_collection(path)?
        };
        Ok(collection.with_validators(self.validators.clone()))
    }

    fn bot_member(&self) -> SyncResult<Member> {
        let bot = &self.config.bot;
        Ok(Member::new(&bot.username, Source::Manual)?.with_email(bot.email.clone()))
    }

    /// Organization, team and repository sources. Teams and repositories
    /// are discovered from the organization; non-empty `issues.teams` or
    /// `issues.repositories` lists restrict discovery to the named entries.
    async fn candidate_sources(&self) -> SyncResult<Vec<CandidateSource>> {
        let org = &self.config.organization;
        let wanted_teams = &self.config.issues.teams;
        let wanted_repos = &self.config.issues.repositories;
        let mut sources = vec![CandidateSource::Organization(org.clone())];

        let teams = self.platform.list_teams(org).await?;
        sources.extend(
            teams
                .into_iter()
                .filter(|team| {
                    wanted_teams.is_empty()
                        || wanted_teams.iter().any(|w| w.eq_ignore_ascii_case(&team.slug))
                })
                .map(|team| CandidateSource::Team {
                    org: org.clone(),
                    slug: team.slug,
                }),
        );

        let repositories = self.platform.list_repositories(org).await?;
        sources.extend(
            repositories
                .into_iter()
                .filter(|repo| {
                    wanted_repos.is_empty()
                        || wanted_repos.iter().any(|w| {
                            w.eq_ignore_ascii_case(&repo.full_name)
                                || w.eq_ignore_ascii_case(&repo.name)
                        })
                })
                .map(|repo| CandidateSource::Repository(repo.full_name)),
        );

        debug!(sources = sources.len(), "Discovered candidate sources");
        Ok(sources)
    }

    async fn collect_candidates(
        &self,
        sources: Vec<CandidateSource>,
        with_directory: bool,
        known: Arc<HashSet<String>>,
    ) -> SyncResult<BTreeMap<String, GuessOutcome>> {
        let collector = CandidateCollector::new(
            Arc::clone(&self.platform),
            with_directory.then(|| Arc::clone(&self.directory)),
            Arc::new(self.config.corporate.clone()),
            self.config.concurrency,
        );
        collector.collect(sources, known).await
    }

    /// Open a session and probe it. Unreachable directories yield `None`
    /// unless the run is strict.
    async fn open_directory(&self) -> SyncResult<Option<DirectorySearchClient>> {
        let opened = async {
            let mut client = self.directory.open().await?;
            client.probe().await?;
            Ok::<_, DirectoryError>(client)
        }
        .await;

        match opened {
            Ok(client) => Ok(Some(client)),
            Err(e) => self.tolerate(e.into()).map(|()| None),
        }
    }

    /// Connectivity faults are tolerated unless the run is strict.
    fn tolerate(&self, e: SyncError) -> SyncResult<()> {
        match e {
            SyncError::DirectoryUnavailable(inner)
                if !self.config.options.fail_without_directory =>
            {
                warn!(error = %inner, "Directory unreachable, skipping directory work");
                Ok(())
            }
            other => Err(other),
        }
    }

    /// Re-check every unmarked directory-confirmed record.
    async fn validate_confirmed(
        &self,
        client: &mut DirectorySearchClient,
        confirmed: &MemberCollection,
        deadline: NaiveDate,
    ) -> SyncResult<ConfirmedChanges> {
        let mut changes = ConfirmedChanges::default();

        for member in confirmed.filter(|m| !m.is_marked_for_removal()) {
            let username = member.platform_username();
            let filter = match member.directory_email() {
                Some(email) => Filter::and(vec![
                    client.email_filter(email),
                    client.social_filter(SocialService::Platform, username, MatchMode::Fuzzy),
                ]),
                None => client.social_filter(SocialService::Platform, username, MatchMode::Exact),
            };

            match client.retrieve(&filter).await? {
                Some(record) if record.lists_platform_handle(username) => {
                    let refreshed = record.to_member(username, member.source())?;
                    if refreshed != member {
                        debug!(username, "Directory data changed");
                        changes.changed.push(username.to_string());
                    }
                    changes.found.push(refreshed);
                }
                _ => {
                    warn!(username, delete_after = %deadline, "Member no longer found in directory, marking for removal");
                    changes
                        .marked
                        .push(member.clone().with_delete_after(Some(deadline)));
                }
            }
        }
        Ok(changes)
    }

    /// Check unmarked supplementary records by corporate email.
    async fn validate_supplementary(
        &self,
        client: &mut DirectorySearchClient,
        supplementary: &MemberCollection,
        bot: &Member,
        deadline: NaiveDate,
    ) -> SyncResult<SupplementaryChanges> {
        let mut changes = SupplementaryChanges::default();

        for member in supplementary.filter(|m| !m.is_marked_for_removal() && m.key() != bot.key()) {
            let username = member.platform_username();
            let Some(email) = member.directory_email() else {
                warn!(username, "Supplementary member has no email, skipping validation");
                continue;
            };

            let filter = client.email_filter(email);
            match client.retrieve(&filter).await? {
                Some(record) if record.lists_platform_handle(username) => {
                    let promoted = record.to_member(username, member.source())?;
                    changes.promoted.push(promoted);
                }
                Some(_) => {
                    debug!(username, "Directory entry does not list this account, keeping as supplementary");
                }
                None => {
                    warn!(username, delete_after = %deadline, "Supplementary email not in directory, marking for removal");
                    changes
                        .marked
                        .push(member.clone().with_delete_after(Some(deadline)));
                }
            }
        }
        Ok(changes)
    }

    /// Exact social-profile lookup for accounts in neither collection.
    async fn resolve_unknown(
        &self,
        client: &mut DirectorySearchClient,
        unknown: &[String],
    ) -> SyncResult<(Vec<Member>, Vec<String>)> {
        let mut added = Vec::new();
        let mut unresolved = Vec::new();

        for login in unknown {
            let filter = client.social_filter(SocialService::Platform, login, MatchMode::Exact);
            match client.retrieve(&filter).await? {
                Some(record) => {
                    let member = record.to_member(login, Source::Automated)?;
                    added.push(member);
                }
                None => {
                    debug!(username = %login, "No exact directory match");
                    unresolved.push(login.clone());
                }
            }
        }
        Ok((added, unresolved))
    }

    /// Comment on the open report issue, or open one. Returns the issue
    /// number, or `None` when nothing was posted.
    async fn post_issue(&self, pending: &IssueReport) -> SyncResult<Option<u64>> {
        if pending.is_empty() {
            info!("Nothing to report");
            return Ok(None);
        }

        let issues = &self.config.issues;
        let rendered = self.renderer.render(&issues.title, pending);
        let repo = match (&issues.repository, self.config.options.dry_run) {
            (Some(repo), false) => repo,
            _ => {
                info!(title = %rendered.title, body = %rendered.body, "Dry run, issue not posted");
                return Ok(None);
            }
        };

        if let Some(label) = issues.labels.first() {
            if let Some(open) = self.platform.find_open_issue(repo, label).await? {
                self.platform
                    .comment_issue(repo, open.number, &rendered.body)
                    .await?;
                info!(repo = %repo, issue = open.number, "Commented on open report issue");
                return Ok(Some(open.number));
            }
        }

        let created = self
            .platform
            .create_issue(repo, &rendered.title, &rendered.body)
            .await?;
        if !issues.labels.is_empty() {
            self.platform
                .add_labels(repo, created.number, &issues.labels)
                .await?;
        }
        info!(repo = %repo, issue = created.number, "Opened report issue");
        Ok(Some(created.number))
    }
}

fn usernames(members: &[Member]) -> Vec<String> {
    members
        .iter()
        .map(|m| m.platform_username().to_string())
        .collect()
}
