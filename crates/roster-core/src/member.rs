//! Member record
//!
//! One reconciled identity: a platform username, the corporate email it
//! resolves to (if known yet), and the secondary identities linked to it.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{RosterError, RosterResult};
use crate::normalize::normalize_accounts;

/// Provenance of a member record. Kept for audit only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Added by a reconciliation run.
    Automated,
    /// Added by hand.
    Manual,
    /// Submitted through an external request form.
    ExternalForm,
}

impl Source {
    /// Literal name written to the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Automated => "Automated",
            Source::Manual => "Manual",
            Source::ExternalForm => "ExternalForm",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Automated" => Ok(Source::Automated),
            "Manual" => Ok(Source::Manual),
            // Older stores used the name of the form provider.
            "ExternalForm" | "GoogleForm" => Ok(Source::ExternalForm),
            other => Err(format!("unknown source '{other}'")),
        }
    }
}

/// Point-in-time copy of a platform profile. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    /// Display name.
    pub name: Option<String>,
    /// Free-text employer field.
    pub company: Option<String>,
    /// Login handle.
    pub login: Option<String>,
    /// Public contact email.
    pub email: Option<String>,
}

/// A reconciled organization member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    directory_email: Option<String>,
    platform_username: String,
    linked_platform_accounts: Vec<String>,
    linked_secondary_accounts: Vec<String>,
    source: Source,
    delete_after: Option<NaiveDate>,
    profile: Option<ProfileSnapshot>,
}

impl Member {
    /// Create a member with no email, links or removal date.
    pub fn new(platform_username: impl Into<String>, source: Source) -> RosterResult<Self> {
        let platform_username = platform_username.into().trim().to_string();
        if platform_username.is_empty() {
            return Err(RosterError::EmptyUsername);
        }

        Ok(Self {
            directory_email: None,
            platform_username,
            linked_platform_accounts: Vec::new(),
            linked_secondary_accounts: Vec::new(),
            source,
            delete_after: None,
            profile: None,
        })
    }

    /// Set the resolved corporate email. Blank values clear it.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.directory_email = email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        self
    }

    /// Set linked platform accounts, normalizing each entry.
    #[must_use]
    pub fn with_linked_platform_accounts<I, S>(mut self, accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.linked_platform_accounts = normalize_accounts(accounts);
        self
    }

    /// Set linked secondary-service accounts, normalizing each entry.
    #[must_use]
    pub fn with_linked_secondary_accounts<I, S>(mut self, accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.linked_secondary_accounts = normalize_accounts(accounts);
        self
    }

    /// Set or clear the removal date.
    #[must_use]
    pub fn with_delete_after(mut self, date: Option<NaiveDate>) -> Self {
        self.delete_after = date;
        self
    }

    /// Attach a platform profile snapshot.
    #[must_use]
    pub fn with_profile(mut self, profile: ProfileSnapshot) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Set the provenance.
    #[must_use]
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn directory_email(&self) -> Option<&str> {
        self.directory_email.as_deref()
    }

    pub fn platform_username(&self) -> &str {
        &self.platform_username
    }

    /// Case-insensitive collection key.
    pub fn key(&self) -> String {
        self.platform_username.to_lowercase()
    }

    pub fn linked_platform_accounts(&self) -> &[String] {
        &self.linked_platform_accounts
    }

    pub fn linked_secondary_accounts(&self) -> &[String] {
        &self.linked_secondary_accounts
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn delete_after(&self) -> Option<NaiveDate> {
        self.delete_after
    }

    pub fn profile(&self) -> Option<&ProfileSnapshot> {
        self.profile.as_ref()
    }

    /// Whether the record carries a removal date.
    pub fn is_marked_for_removal(&self) -> bool {
        self.delete_after.is_some()
    }

    /// Whether the removal date is strictly before `cutoff`.
    pub fn is_expired(&self, cutoff: NaiveDate) -> bool {
        self.delete_after.is_some_and(|d| d < cutoff)
    }

    /// Directory account id derived from the email local part.
    pub fn fallback_uid(&self) -> Option<&str> {
        self.directory_email
            .as_deref()
            .and_then(email_local_part)
    }

    pub(crate) fn set_linked_platform_accounts(&mut self, accounts: Vec<String>) {
        self.linked_platform_accounts = accounts;
    }

    pub(crate) fn set_linked_secondary_accounts(&mut self, accounts: Vec<String>) {
        self.linked_secondary_accounts = accounts;
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.directory_email {
            Some(email) => write!(f, "{} <{}>", self.platform_username, email),
            None => f.write_str(&self.platform_username),
        }
    }
}

/// Local part of an email address, if it has one.
pub fn email_local_part(email: &str) -> Option<&str> {
    email
        .split_once('@')
        .map(|(local, _)| local)
        .filter(|local| !local.is_empty())
}
