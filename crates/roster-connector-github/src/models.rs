//! Platform API payloads.

use roster_core::{AccountKind, ProfileSnapshot};
use serde::{Deserialize, Serialize};

/// Account summary as returned by list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountSummary {
    pub login: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Full user profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubUser {
    pub login: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl GithubUser {
    /// Account kind from the `type` field.
    pub fn account_kind(&self) -> Option<AccountKind> {
        self.kind.as_deref().and_then(account_kind)
    }

    /// Point-in-time copy used by identity guessing.
    pub fn to_profile(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            name: self.name.clone(),
            company: self.company.clone(),
            login: Some(self.login.clone()),
            email: self.email.clone(),
        }
    }
}

pub(crate) fn account_kind(kind: &str) -> Option<AccountKind> {
    match kind {
        "User" => Some(AccountKind::User),
        "Organization" => Some(AccountKind::Organization),
        "Bot" => Some(AccountKind::Bot),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Team {
    pub slug: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub state: String,
    /// Present when the "issue" is a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// Outcome posted with a pull-request review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewEvent {
    Approve,
    RequestChanges,
    Comment,
}

impl ReviewEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewEvent::Approve => "APPROVE",
            ReviewEvent::RequestChanges => "REQUEST_CHANGES",
            ReviewEvent::Comment => "COMMENT",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentResponse {
    pub content: String,
    #[serde(default)]
    pub encoding: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewIssue<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct LabelsRequest<'a> {
    pub labels: &'a [String],
}

#[derive(Debug, Serialize)]
pub(crate) struct CommentRequest<'a> {
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReviewRequest<'a> {
    pub body: &'a str,
    pub event: ReviewEvent,
}
