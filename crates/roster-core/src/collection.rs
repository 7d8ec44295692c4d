//! Member collection
//!
//! A keyed set of member records bound to the store file it was read from.
//! Keys are platform usernames compared case-insensitively. Iteration order
//! is key order, which keeps written stores stable across runs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{RosterError, RosterResult};
use crate::member::Member;
use crate::validate::Validators;

/// An in-memory member collection backed by one store file.
#[derive(Debug, Clone)]
pub struct MemberCollection {
    path: PathBuf,
    members: BTreeMap<String, Member>,
    validators: Validators,
}

impl MemberCollection {
    /// Create an empty collection bound to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            members: BTreeMap::new(),
            validators: Validators::none(),
        }
    }

    /// Attach identity providers used to validate linked accounts.
    #[must_use]
    pub fn with_validators(mut self, validators: Validators) -> Self {
        self.validators = validators;
        self
    }

    pub fn set_validators(&mut self, validators: Validators) {
        self.validators = validators;
    }

    /// Store file backing this collection.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Validate `member` and insert it, returning the record it replaced.
    pub async fn put(&mut self, member: Member) -> Option<Member> {
        let member = self.validate(member).await;
        debug!(
            username = %member.platform_username(),
            path = %self.path.display(),
            "Storing member"
        );
        self.members.insert(member.key(), member)
    }

    /// Insert without validation. Used when loading a store.
    pub(crate) fn insert_loaded(&mut self, member: Member) -> Option<Member> {
        self.members.insert(member.key(), member)
    }

    /// Insert `member` unless its username is already present.
    ///
    /// Returns `true` when the record was added.
    pub fn ensure_present(&mut self, member: Member) -> bool {
        let key = member.key();
        if self.members.contains_key(&key) {
            return false;
        }
        info!(
            username = %member.platform_username(),
            path = %self.path.display(),
            "Injecting missing member"
        );
        self.members.insert(key, member);
        true
    }

    /// Remove by username. Absent usernames are ignored.
    pub fn remove(&mut self, username: &str) -> Option<Member> {
        self.members.remove(&username.to_lowercase())
    }

    /// Remove the record with the same username as `member`.
    pub fn remove_member(&mut self, member: &Member) -> Option<Member> {
        self.members.remove(&member.key())
    }

    /// Remove every listed record, returning the ones that were present.
    pub fn remove_all<'a, I>(&mut self, members: I) -> Vec<Member>
    where
        I: IntoIterator<Item = &'a Member>,
    {
        members
            .into_iter()
            .filter_map(|m| self.remove_member(m))
            .collect()
    }

    /// Remove every record whose removal date is strictly before `cutoff`.
    pub fn remove_expired(&mut self, cutoff: NaiveDate) -> Vec<Member> {
        let expired: Vec<String> = self
            .members
            .iter()
            .filter(|(_, m)| m.is_expired(cutoff))
            .map(|(k, _)| k.clone())
            .collect();

        let removed: Vec<Member> = expired
            .iter()
            .filter_map(|k| self.members.remove(k))
            .collect();

        if !removed.is_empty() {
            info!(
                count = removed.len(),
                cutoff = %cutoff,
                path = %self.path.display(),
                "Removed expired members"
            );
        }
        removed
    }

    /// Re-validate and overwrite existing records.
    ///
    /// Fails without changing anything if any username is not already held.
    pub async fn replace(&mut self, members: Vec<Member>) -> RosterResult<()> {
        if let Some(missing) = members.iter().find(|m| !self.members.contains_key(&m.key())) {
            return Err(RosterError::MissingKey {
                username: missing.platform_username().to_string(),
                path: self.path.clone(),
            });
        }

        for member in members {
            let member = self.validate(member).await;
            self.members.insert(member.key(), member);
        }
        Ok(())
    }

    /// Snapshot of the records matching `predicate`.
    pub fn filter<P>(&self, predicate: P) -> Vec<Member>
    where
        P: Fn(&Member) -> bool,
    {
        self.members
            .values()
            .filter(|m| predicate(m))
            .cloned()
            .collect()
    }

    pub fn contains_key(&self, username: &str) -> bool {
        self.members.contains_key(&username.to_lowercase())
    }

    pub fn get(&self, username: &str) -> Option<&Member> {
        self.members.get(&username.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Records in key order.
    pub fn items(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    /// Re-key by linked secondary-service accounts.
    ///
    /// A record with N linked secondary accounts appears under N keys. The
    /// result carries no validators.
    pub fn to_secondary_keyed(&self) -> MemberCollection {
        let mut keyed = MemberCollection::new(self.path.clone());
        for member in self.members.values() {
            for handle in member.linked_secondary_accounts() {
                keyed
                    .members
                    .insert(handle.to_lowercase(), member.clone());
            }
        }
        keyed
    }

    async fn validate(&self, member: Member) -> Member {
        if self.validators.is_empty() {
            return member;
        }
        self.validators.validate(member).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::Source;

    fn member(name: &str) -> Member {
        Member::new(name, Source::Automated).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[tokio::test]
    async fn test_put_is_case_insensitive() {
        let mut c = MemberCollection::new("members.csv");
        assert!(c.put(member("Alice")).await.is_none());
        let previous = c.put(member("alice")).await;
        assert_eq!(previous.unwrap().platform_username(), "Alice");
        assert_eq!(c.len(), 1);
        assert!(c.contains_key("ALICE"));
    }

    #[tokio::test]
    async fn test_size_never_exceeds_distinct_usernames() {
        let mut c = MemberCollection::new("members.csv");
        for name in ["a", "A", "b", "B", "b", "c"] {
            c.put(member(name)).await;
        }
        assert_eq!(c.len(), 3);
    }

    #[tokio::test]
    async fn test_remove_variants() {
        let mut c = MemberCollection::new("members.csv");
        for name in ["a", "b", "c", "d"] {
            c.put(member(name)).await;
        }

        assert!(c.remove("A").is_some());
        assert!(c.remove("missing").is_none());
        assert!(c.remove_member(&member("b")).is_some());

        let removed = c.remove_all(&[member("c"), member("zzz")]);
        assert_eq!(removed.len(), 1);
        assert_eq!(c.keys().collect::<Vec<_>>(), vec!["d"]);
    }

    #[tokio::test]
    async fn test_remove_expired_is_strict() {
        let mut c = MemberCollection::new("members.csv");
        c.put(member("before").with_delete_after(Some(day(9)))).await;
        c.put(member("equal").with_delete_after(Some(day(10)))).await;
        c.put(member("after").with_delete_after(Some(day(11)))).await;
        c.put(member("unmarked")).await;

        let removed = c.remove_expired(day(10));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].platform_username(), "before");
        assert_eq!(c.len(), 3);
        assert!(c.contains_key("equal"));
    }

    #[tokio::test]
    async fn test_replace_requires_existing_keys() {
        let mut c = MemberCollection::new("members.csv");
        c.put(member("a")).await;

        let err = c
            .replace(vec![
                member("a").with_delete_after(Some(day(1))),
                member("b"),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, RosterError::MissingKey { .. }));
        assert!(!c.get("a").unwrap().is_marked_for_removal());

        c.replace(vec![member("a").with_delete_after(Some(day(1)))])
            .await
            .unwrap();
        assert!(c.get("a").unwrap().is_marked_for_removal());
    }

    #[tokio::test]
    async fn test_put_validates_linked_accounts() {
        let mut c = MemberCollection::new("members.csv")
            .with_validators(crate::validate::tests::validators());
        c.put(
            member("alice")
                .with_linked_platform_accounts(["https://github.com/someorg/somerepo", "alice-alt"]),
        )
        .await;

        assert_eq!(
            c.get("alice").unwrap().linked_platform_accounts(),
            ["alice-alt"]
        );
    }

    #[tokio::test]
    async fn test_filter_does_not_mutate() {
        let mut c = MemberCollection::new("members.csv");
        c.put(member("a").with_delete_after(Some(day(1)))).await;
        c.put(member("b")).await;

        let marked = c.filter(Member::is_marked_for_removal);
        assert_eq!(marked.len(), 1);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_ensure_present_only_adds_once() {
        let mut c = MemberCollection::new("members.csv");
        assert!(c.ensure_present(member("ci-bot")));
        assert!(!c.ensure_present(member("CI-Bot")));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_to_secondary_keyed_fans_out() {
        let mut c = MemberCollection::new("members.csv");
        c.ensure_present(member("alice").with_linked_secondary_accounts(["alice", "Alice_Robot"]));
        c.ensure_present(member("bob"));

        let keyed = c.to_secondary_keyed();
        assert_eq!(keyed.len(), 2);
        assert!(keyed.contains_key("alice_robot"));
        assert_eq!(keyed.get("alice").unwrap().platform_username(), "alice");
        assert!(!keyed.contains_key("bob"));
    }
}
