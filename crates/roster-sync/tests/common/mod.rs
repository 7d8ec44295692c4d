//! Integration test helpers for roster-sync.
//!
//! Provides a scripted platform client, directory fixtures and member
//! stores in a temporary directory.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, Once};

use async_trait::async_trait;
use roster_connector_github::{
    GithubResult, GithubUser, Issue, PlatformClient, Repository, ReviewEvent, Team,
};
use roster_connector_ldap::{DirectoryConfig, DirectoryEntry, InMemoryDirectory};
use roster_core::AccountKind;
use roster_sync::{ReconciliationService, RosterConfig};
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Initialize logging for tests (once).
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

pub const HEADER: &str =
    "RedHatEmailAddress,GitHubUsername,LinkedGitHubUsernames,LinkedQuayUsernames,Source,DeleteAfter\n";

pub const ISSUE_REPO: &str = "acme/membership";

/// Platform state a test scripts and inspects.
#[derive(Debug, Default)]
pub struct PlatformState {
    pub members: Vec<String>,
    /// Team members by slug.
    pub teams: BTreeMap<String, Vec<String>>,
    /// Repository collaborators by `owner/name`.
    pub collaborators: BTreeMap<String, Vec<String>>,
    /// Profiles by lowercase login. Members without one get a bare profile.
    pub users: HashMap<String, GithubUser>,
    /// Handles that resolve to no account.
    pub missing_accounts: HashSet<String>,
    /// File contents keyed by `repo/path@ref`.
    pub files: HashMap<String, String>,
    pub open_issue: Option<Issue>,
    pub created: Vec<(String, String, String)>,
    pub labels: Vec<(String, u64, Vec<String>)>,
    pub comments: Vec<(String, u64, String)>,
    pub reviews: Vec<(String, u64, String, ReviewEvent)>,
    pub member_listings: usize,
    /// Take this directory offline once the organization has been listed
    /// the given number of times.
    pub offline_after_listings: Option<(usize, InMemoryDirectory)>,
}

/// In-process platform client.
#[derive(Debug, Default)]
pub struct FakePlatform {
    state: Mutex<PlatformState>,
}

impl FakePlatform {
    pub fn with_members(members: &[&str]) -> Self {
        let platform = Self::default();
        platform.state().members = members.iter().map(|m| m.to_string()).collect();
        platform
    }

    pub fn state(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap()
    }

    pub fn add_profile(&self, login: &str, name: Option<&str>, company: Option<&str>, email: Option<&str>) {
        self.state().users.insert(
            login.to_lowercase(),
            GithubUser {
                login: login.to_string(),
                kind: Some("User".to_string()),
                name: name.map(str::to_string),
                company: company.map(str::to_string),
                email: email.map(str::to_string),
            },
        );
    }

    pub fn add_team(&self, slug: &str, members: &[&str]) {
        self.state()
            .teams
            .insert(slug.to_string(), members.iter().map(|m| m.to_string()).collect());
    }

    pub fn add_collaborators(&self, repo: &str, logins: &[&str]) {
        self.state()
            .collaborators
            .insert(repo.to_string(), logins.iter().map(|m| m.to_string()).collect());
    }

    pub fn add_file(&self, repo: &str, path: &str, git_ref: &str, content: &str) {
        self.state()
            .files
            .insert(format!("{repo}/{path}@{git_ref}"), content.to_string());
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn list_org_members(&self, _org: &str) -> GithubResult<Vec<String>> {
        let mut state = self.state();
        state.member_listings += 1;
        if let Some((listings, directory)) = &state.offline_after_listings {
            if state.member_listings >= *listings {
                directory.set_reachable(false);
            }
        }
        Ok(state.members.clone())
    }

    async fn list_teams(&self, _org: &str) -> GithubResult<Vec<Team>> {
        Ok(self
            .state()
            .teams
            .keys()
            .map(|slug| Team {
                slug: slug.clone(),
                name: slug.clone(),
            })
            .collect())
    }

    async fn list_team_members(&self, _org: &str, team_slug: &str) -> GithubResult<Vec<String>> {
        Ok(self.state().teams.get(team_slug).cloned().unwrap_or_default())
    }

    async fn list_repositories(&self, org: &str) -> GithubResult<Vec<Repository>> {
        Ok(self
            .state()
            .collaborators
            .keys()
            .map(|full_name| Repository {
                name: full_name.trim_start_matches(&format!("{org}/")).to_string(),
                full_name: full_name.clone(),
            })
            .collect())
    }

    async fn list_repository_collaborators(&self, repo: &str) -> GithubResult<Vec<String>> {
        Ok(self.state().collaborators.get(repo).cloned().unwrap_or_default())
    }

    async fn get_user(&self, login: &str) -> GithubResult<Option<GithubUser>> {
        let state = self.state();
        if let Some(user) = state.users.get(&login.to_lowercase()) {
            return Ok(Some(user.clone()));
        }
        if state.missing_accounts.contains(&login.to_lowercase()) {
            return Ok(None);
        }
        Ok(Some(GithubUser {
            login: login.to_string(),
            kind: Some("User".to_string()),
            ..GithubUser::default()
        }))
    }

    async fn resolve_account(&self, handle: &str) -> GithubResult<Option<AccountKind>> {
        if handle.contains('/') {
            return Ok(Some(AccountKind::Repository));
        }
        if self.state().missing_accounts.contains(&handle.to_lowercase()) {
            return Ok(None);
        }
        Ok(Some(AccountKind::User))
    }

    async fn get_file_content(&self, repo: &str, path: &str, git_ref: &str) -> GithubResult<String> {
        let key = format!("{repo}/{path}@{git_ref}");
        self.state()
            .files
            .get(&key)
            .cloned()
            .ok_or(roster_connector_github::GithubError::NotFound(key))
    }

    async fn find_open_issue(&self, _repo: &str, _label: &str) -> GithubResult<Option<Issue>> {
        Ok(self.state().open_issue.clone())
    }

    async fn create_issue(&self, repo: &str, title: &str, body: &str) -> GithubResult<Issue> {
        let mut state = self.state();
        state
            .created
            .push((repo.to_string(), title.to_string(), body.to_string()));
        Ok(issue(100 + state.created.len() as u64, title))
    }

    async fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> GithubResult<()> {
        self.state()
            .labels
            .push((repo.to_string(), number, labels.to_vec()));
        Ok(())
    }

    async fn comment_issue(&self, repo: &str, number: u64, body: &str) -> GithubResult<()> {
        self.state()
            .comments
            .push((repo.to_string(), number, body.to_string()));
        Ok(())
    }

    async fn create_review(
        &self,
        repo: &str,
        pull_number: u64,
        body: &str,
        event: ReviewEvent,
    ) -> GithubResult<()> {
        self.state()
            .reviews
            .push((repo.to_string(), pull_number, body.to_string(), event));
        Ok(())
    }
}

pub fn issue(number: u64, title: &str) -> Issue {
    Issue {
        number,
        title: title.to_string(),
        html_url: format!("https://github.com/{ISSUE_REPO}/issues/{number}"),
        state: "open".to_string(),
        pull_request: None,
    }
}

/// Directory entry for a person with platform and registry handles.
pub fn person(uid: &str, platform: &[&str], registry: &[&str]) -> DirectoryEntry {
    let social = platform
        .iter()
        .map(|h| format!("Github->https://github.com/{h}"))
        .chain(registry.iter().map(|h| format!("Quay->https://quay.io/user/{h}")));
    DirectoryEntry::new(format!("uid={uid},ou=users,dc=corp"))
        .with_attr("uid", [uid])
        .with_attr("cn", [format!("{uid} person")])
        .with_attr("mail", [format!("{uid}@redhat.com")])
        .with_attr("rhatSocialURL", social)
}

pub fn directory(entries: Vec<DirectoryEntry>) -> InMemoryDirectory {
    InMemoryDirectory::new(DirectoryConfig::new("ldap.corp.example", "dc=corp"))
        .with_entries(entries)
}

/// Stores, platform and directory for one scenario.
pub struct Harness {
    pub dir: TempDir,
    pub platform: Arc<FakePlatform>,
    pub directory: InMemoryDirectory,
}

impl Harness {
    pub fn new(members: &[&str], entries: Vec<DirectoryEntry>) -> Self {
        init_test_logging();
        let harness = Self {
            dir: TempDir::new().unwrap(),
            platform: Arc::new(FakePlatform::with_members(members)),
            directory: directory(entries),
        };
        harness.write_confirmed("");
        harness.write_supplementary("");
        harness
    }

    pub fn confirmed_path(&self) -> PathBuf {
        self.dir.path().join("ldap.csv")
    }

    pub fn supplementary_path(&self) -> PathBuf {
        self.dir.path().join("manual.csv")
    }

    /// Write data rows under the store header.
    pub fn write_confirmed(&self, rows: &str) {
        std::fs::write(self.confirmed_path(), format!("{HEADER}{rows}")).unwrap();
    }

    pub fn write_supplementary(&self, rows: &str) {
        std::fs::write(self.supplementary_path(), format!("{HEADER}{rows}")).unwrap();
    }

    pub fn read_confirmed(&self) -> Vec<u8> {
        std::fs::read(self.confirmed_path()).unwrap()
    }

    pub fn read_supplementary(&self) -> Vec<u8> {
        std::fs::read(self.supplementary_path()).unwrap()
    }

    /// Configuration pointing at this harness's stores.
    pub fn config(&self) -> RosterConfig {
        let yaml = format!(
            r#"
organization: acme
stores:
  directory_confirmed: {}
  supplementary: {}
directory:
  host: ldap.corp.example
  base_dn: dc=corp
issues:
  repository: {ISSUE_REPO}
"#,
            self.confirmed_path().display(),
            self.supplementary_path().display(),
        );
        RosterConfig::from_yaml(&yaml).unwrap()
    }

    pub fn service(&self, config: RosterConfig) -> ReconciliationService {
        ReconciliationService::new(
            Arc::new(config),
            self.platform.clone(),
            Arc::new(self.directory.clone()),
        )
    }
}
