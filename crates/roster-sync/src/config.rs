//! Run configuration loading and types.

use std::path::{Path, PathBuf};

use roster_connector_github::GithubConfig;
use roster_connector_ldap::DirectoryConfig;
use roster_connector_quay::QuayConfig;
use serde::Deserialize;

use crate::error::{SyncError, SyncResult};

/// Root configuration for one reconciliation run.
#[derive(Debug, Clone, Deserialize)]
pub struct RosterConfig {
    /// Platform organization to reconcile.
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub mode: RunMode,
    #[serde(default)]
    pub options: SyncOptions,
    #[serde(default)]
    pub stores: StoreConfig,
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub corporate: CorporateConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub quay: QuayConfig,
    #[serde(default)]
    pub issues: IssueConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    /// Days between a failed re-validation and removal.
    #[serde(default = "default_grace_period_days")]
    pub grace_period_days: u32,
    /// Concurrent candidate-source tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_grace_period_days() -> u32 {
    7
}

fn default_concurrency() -> usize {
    4
}

/// What one invocation does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Batch sync of both member stores.
    #[default]
    Sync,
    /// Sync, remove expired records and report unknown members in an issue.
    RaiseIssues,
    /// Review a pull request that adds registry handles.
    ReviewPullRequest,
}

/// Switches exposed to operators.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncOptions {
    /// Re-check existing records against the directory.
    #[serde(default)]
    pub validate_directory: bool,
    /// Compute everything, write and post nothing.
    #[serde(default)]
    pub dry_run: bool,
    /// Abort when the directory cannot be reached instead of skipping.
    #[serde(default)]
    pub fail_without_directory: bool,
}

/// Member store locations.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_directory_confirmed_store")]
    pub directory_confirmed: PathBuf,
    #[serde(default = "default_supplementary_store")]
    pub supplementary: PathBuf,
    /// Start from an empty collection when a store file is absent.
    #[serde(default)]
    pub create_missing: bool,
}

fn default_directory_confirmed_store() -> PathBuf {
    PathBuf::from("ldap.csv")
}

fn default_supplementary_store() -> PathBuf {
    PathBuf::from("manual.csv")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory_confirmed: default_directory_confirmed_store(),
            supplementary: default_supplementary_store(),
            create_missing: false,
        }
    }
}

/// Corporate identity markers used by guessing.
#[derive(Debug, Clone, Deserialize)]
pub struct CorporateConfig {
    /// Corporate email domain, without `@`.
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Employer spellings matched case-insensitively against profile
    /// company fields.
    #[serde(default = "default_brand_names")]
    pub brand_names: Vec<String>,
}

fn default_domain() -> String {
    "redhat.com".to_string()
}

fn default_brand_names() -> Vec<String> {
    vec!["redhat".to_string(), "red hat".to_string()]
}

impl Default for CorporateConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            brand_names: default_brand_names(),
        }
    }
}

impl CorporateConfig {
    /// Whether `email` belongs to the corporate domain.
    pub fn is_corporate_email(&self, email: &str) -> bool {
        let suffix = format!("@{}", self.domain.trim_start_matches('@'));
        email.len() > suffix.len()
            && email
                .get(email.len() - suffix.len()..)
                .is_some_and(|tail| tail.eq_ignore_ascii_case(&suffix))
    }

    /// Whether a free-text employer field names the corporation.
    pub fn is_corporate_employer(&self, company: &str) -> bool {
        let company = company.to_lowercase();
        self.brand_names
            .iter()
            .any(|brand| company.contains(&brand.to_lowercase()))
    }
}

/// The automation account kept in the supplementary store.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_bot_username")]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

fn default_bot_username() -> String {
    "roster-bot".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            username: default_bot_username(),
            email: None,
        }
    }
}

/// Where and how membership reports are posted.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueConfig {
    /// Destination repository, `owner/name`.
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default = "default_issue_title")]
    pub title: String,
    /// Labels applied to new issues. The first one finds an open issue.
    #[serde(default = "default_issue_labels")]
    pub labels: Vec<String>,
    /// Team slugs whose members are candidates. Empty means every team in
    /// the organization.
    #[serde(default)]
    pub teams: Vec<String>,
    /// Repositories (`owner/name` or `name`) whose collaborators are
    /// candidates. Empty means every repository in the organization.
    #[serde(default)]
    pub repositories: Vec<String>,
}

fn default_issue_title() -> String {
    "Organization membership report".to_string()
}

fn default_issue_labels() -> Vec<String> {
    vec!["membership".to_string()]
}

impl Default for IssueConfig {
    fn default() -> Self {
        Self {
            repository: None,
            title: default_issue_title(),
            labels: default_issue_labels(),
            teams: Vec::new(),
            repositories: Vec::new(),
        }
    }
}

/// Pull request to review in `review-pull-request` mode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewConfig {
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub pull_number: Option<u64>,
    /// File listing one registry handle per line.
    #[serde(default)]
    pub path: Option<String>,
    /// Defaults to the pull request head.
    #[serde(default)]
    pub git_ref: Option<String>,
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info,roster=debug".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl RosterConfig {
    /// Load from the file named by `ROSTER_CONFIG`, then apply environment
    /// overrides and validate.
    pub fn load() -> SyncResult<Self> {
        let mut config = Self::from_file(Self::config_path())?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SyncResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SyncError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(content: &str) -> SyncResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| SyncError::Configuration(format!("Failed to parse config: {e}")))
    }

    /// Config file path from the environment.
    pub fn config_path() -> String {
        std::env::var("ROSTER_CONFIG").unwrap_or_else(|_| "./config/roster.yaml".to_string())
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(token) = lookup("QUAY_TOKEN") {
            self.quay.token = Some(token);
        }
        if let Some(password) = lookup("ROSTER_LDAP_BIND_PASSWORD") {
            self.directory.bind_password = Some(password);
        }
        if let Some(org) = lookup("ROSTER_ORGANIZATION") {
            self.organization = org;
        }
        if let Some(number) = lookup("ROSTER_PULL_NUMBER").and_then(|n| n.parse().ok()) {
            self.review.pull_number = Some(number);
        }
    }

    /// Check required settings for the configured mode.
    pub fn validate(&self) -> SyncResult<()> {
        if self.organization.trim().is_empty() {
            return Err(SyncError::Configuration(
                "organization is required".to_string(),
            ));
        }
        if self.bot.username.trim().is_empty() {
            return Err(SyncError::Configuration(
                "bot.username must not be empty".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(SyncError::Configuration(
                "concurrency must be at least 1".to_string(),
            ));
        }
        self.directory
            .validate()
            .map_err(|e| SyncError::Configuration(e.to_string()))?;
        self.github
            .validate()
            .map_err(|e| SyncError::Configuration(e.to_string()))?;
        Ok(())
    }
}
