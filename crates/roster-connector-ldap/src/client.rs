//! Directory search client
//!
//! One `DirectorySearchClient` wraps one open directory session. Every query
//! identifies at most one person: a filter that matches several entries is
//! an integrity fault, never a pick-the-first.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::config::{DirectoryConfig, SocialService};
use crate::entry::{DirectoryEntry, DirectoryRecord};
use crate::error::{DirectoryError, DirectoryResult};
use crate::filter::Filter;

/// An open session against a directory backend.
#[async_trait]
pub trait DirectorySession: Send {
    /// Subtree search under the configured base, returning the listed attributes.
    async fn search(
        &mut self,
        filter: &Filter,
        attributes: &[&str],
    ) -> DirectoryResult<Vec<DirectoryEntry>>;

    /// Release the session.
    async fn close(&mut self) -> DirectoryResult<()>;
}

/// Opens directory sessions.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    fn config(&self) -> &Arc<DirectoryConfig>;

    async fn connect(&self) -> DirectoryResult<Box<dyn DirectorySession>>;

    /// Open a search client on a fresh session.
    async fn open(&self) -> DirectoryResult<DirectorySearchClient> {
        let session = self.connect().await?;
        Ok(DirectorySearchClient::new(session, Arc::clone(self.config())))
    }
}

/// How social-profile searches compare handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// The stored value equals `<label>-><url><handle>`.
    Exact,
    /// The stored value starts with `<label>->` and contains the handle.
    Fuzzy,
}

/// Search client bound to one directory session.
///
/// Dropping the client releases the session; `close` does so explicitly
/// and reports errors.
pub struct DirectorySearchClient {
    session: Box<dyn DirectorySession>,
    config: Arc<DirectoryConfig>,
}

impl std::fmt::Debug for DirectorySearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySearchClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DirectorySearchClient {
    pub fn new(session: Box<dyn DirectorySession>, config: Arc<DirectoryConfig>) -> Self {
        Self { session, config }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn uid_filter(&self, uid: &str) -> Filter {
        Filter::eq(&self.config.attributes.uid, uid)
    }

    pub fn name_filter(&self, name: &str) -> Filter {
        Filter::eq(&self.config.attributes.name, name)
    }

    pub fn email_filter(&self, email: &str) -> Filter {
        Filter::eq(&self.config.attributes.email, email)
    }

    pub fn social_filter(&self, service: SocialService, handle: &str, mode: MatchMode) -> Filter {
        let social = &self.config.social;
        match mode {
            MatchMode::Exact => Filter::eq(
                &self.config.attributes.social,
                social.value(service, handle),
            ),
            MatchMode::Fuzzy => Filter::wildcard(
                &self.config.attributes.social,
                [social.prefix(service), handle.to_string(), String::new()],
            ),
        }
    }

    /// Look up the configured probe account to confirm the directory answers.
    pub async fn probe(&mut self) -> DirectoryResult<()> {
        let filter = self.uid_filter(&self.config.probe_uid);
        let uid_attribute = self.config.attributes.uid.clone();
        self.session.search(&filter, &[uid_attribute.as_str()]).await?;
        debug!(uid = %self.config.probe_uid, "Directory probe answered");
        Ok(())
    }

    /// `attribute` of the person with this uid.
    pub async fn search_uid(&mut self, uid: &str, attribute: &str) -> DirectoryResult<Option<String>> {
        let filter = self.uid_filter(uid);
        self.find_attribute(&filter, attribute).await
    }

    /// `attribute` of the person with this display name.
    pub async fn search_display_name(
        &mut self,
        name: &str,
        attribute: &str,
    ) -> DirectoryResult<Option<String>> {
        let filter = self.name_filter(name);
        self.find_attribute(&filter, attribute).await
    }

    /// `attribute` of the person with this email.
    pub async fn search_email(
        &mut self,
        email: &str,
        attribute: &str,
    ) -> DirectoryResult<Option<String>> {
        let filter = self.email_filter(email);
        self.find_attribute(&filter, attribute).await
    }

    /// `attribute` of the person whose social profile lists `handle`.
    pub async fn search_social(
        &mut self,
        service: SocialService,
        handle: &str,
        mode: MatchMode,
        attribute: &str,
    ) -> DirectoryResult<Option<String>> {
        let filter = self.social_filter(service, handle, mode);
        self.find_attribute(&filter, attribute).await
    }

    /// First value of `attribute` on the single entry matching `filter`.
    pub async fn find_attribute(
        &mut self,
        filter: &Filter,
        attribute: &str,
    ) -> DirectoryResult<Option<String>> {
        let entry = self.search_one(filter, &[attribute]).await?;
        Ok(entry.and_then(|e| e.first(attribute).map(str::to_string)))
    }

    /// Email and social handles of the single person matching `filter`.
    pub async fn retrieve(&mut self, filter: &Filter) -> DirectoryResult<Option<DirectoryRecord>> {
        let attrs = self.config.attributes.clone();
        let entry = self
            .search_one(
                filter,
                &[
                    attrs.uid.as_str(),
                    attrs.email.as_str(),
                    attrs.social.as_str(),
                ],
            )
            .await?;
        Ok(entry.map(|e| DirectoryRecord::from_entry(&e, &self.config)))
    }

    /// Release the session.
    pub async fn close(mut self) -> DirectoryResult<()> {
        self.session.close().await
    }

    #[instrument(skip_all, fields(filter = %filter))]
    async fn search_one(
        &mut self,
        filter: &Filter,
        attributes: &[&str],
    ) -> DirectoryResult<Option<DirectoryEntry>> {
        let mut entries = self.session.search(filter, attributes).await?;
        match entries.len() {
            0 => Ok(None),
            1 => Ok(entries.pop()),
            count => {
                warn!(count, "Filter matched several directory entries");
                Err(DirectoryError::MultipleEntries {
                    filter: filter.to_ldap(),
                    count,
                })
            }
        }
    }
}
