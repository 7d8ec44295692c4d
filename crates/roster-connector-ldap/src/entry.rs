//! Directory entries and the person records derived from them.

use std::collections::BTreeMap;

use roster_core::{Member, RosterResult, Source};

use crate::config::{DirectoryConfig, SocialService};

/// A raw directory entry.
///
/// Attribute names are held lowercased; directory attribute names are
/// case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    attrs: BTreeMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: BTreeMap::new(),
        }
    }

    /// Add values to an attribute.
    #[must_use]
    pub fn with_attr<I, S>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attrs
            .entry(name.to_lowercase())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// All values of an attribute.
    pub fn values(&self, name: &str) -> &[String] {
        self.attrs
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First value of an attribute.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    /// Keep only the listed attributes. `*` keeps everything.
    pub(crate) fn project(mut self, attributes: &[&str]) -> Self {
        if attributes.iter().any(|a| *a == "*") {
            return self;
        }
        let wanted: Vec<String> = attributes.iter().map(|a| a.to_lowercase()).collect();
        self.attrs.retain(|name, _| wanted.contains(name));
        self
    }
}

/// What the directory knows about one person.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryRecord {
    pub dn: String,
    pub uid: Option<String>,
    pub email: Option<String>,
    /// Platform handles from social-profile values, sorted and de-duplicated.
    pub platform_handles: Vec<String>,
    /// Secondary-service handles, sorted and de-duplicated.
    pub secondary_handles: Vec<String>,
}

impl DirectoryRecord {
    /// Read a record from an entry using the configured schema.
    pub fn from_entry(entry: &DirectoryEntry, config: &DirectoryConfig) -> Self {
        let mut platform_handles = Vec::new();
        let mut secondary_handles = Vec::new();

        for value in entry.values(&config.attributes.social) {
            match config.social.parse(value) {
                Some((SocialService::Platform, handle)) => platform_handles.push(handle),
                Some((SocialService::Secondary, handle)) => secondary_handles.push(handle),
                None => {}
            }
        }

        Self {
            dn: entry.dn.clone(),
            uid: entry.first(&config.attributes.uid).map(str::to_string),
            email: entry.first(&config.attributes.email).map(str::to_string),
            platform_handles: sorted_unique(platform_handles),
            secondary_handles: sorted_unique(secondary_handles),
        }
    }

    /// Whether the record lists `username` as one of its platform handles.
    pub fn lists_platform_handle(&self, username: &str) -> bool {
        self.platform_handles
            .iter()
            .any(|h| h.eq_ignore_ascii_case(username))
    }

    /// Build a member keyed by `username`.
    ///
    /// The other platform handles become linked platform accounts; all
    /// secondary handles become linked secondary accounts.
    pub fn to_member(&self, username: &str, source: Source) -> RosterResult<Member> {
        let linked = self
            .platform_handles
            .iter()
            .filter(|h| !h.eq_ignore_ascii_case(username.trim()));

        Ok(Member::new(username, source)?
            .with_email(self.email.clone())
            .with_linked_platform_accounts(linked)
            .with_linked_secondary_accounts(&self.secondary_handles))
    }
}

/// Sort case-insensitively and drop case-insensitive duplicates.
fn sorted_unique(mut handles: Vec<String>) -> Vec<String> {
    handles.sort_by_key(|h| h.to_lowercase());
    handles.dedup_by(|a, b| a.eq_ignore_ascii_case(b));
    handles
}
