//! Linked account validation
//!
//! A collection with validators attached checks every linked account before
//! storing a record. Accounts that cannot be confirmed are dropped from the
//! record with a warning; validation itself never fails.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::BoxError;
use crate::member::Member;

/// What a platform handle resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountKind {
    /// A natural-person account.
    User,
    /// An organization account.
    Organization,
    /// A machine account.
    Bot,
    /// A repository (handles of the form `owner/name`).
    Repository,
}

impl AccountKind {
    pub fn is_person(&self) -> bool {
        matches!(self, AccountKind::User)
    }
}

/// Resolves platform handles to account kinds.
#[async_trait]
pub trait AccountResolver: Send + Sync {
    /// Resolve a bare handle. `Ok(None)` means the handle does not exist.
    async fn resolve_account(&self, handle: &str) -> Result<Option<AccountKind>, BoxError>;
}

/// Looks up handles on the secondary service.
#[async_trait]
pub trait SecondaryAccountChecker: Send + Sync {
    /// HTTP-style status of the user lookup for `handle`.
    async fn account_status(&self, handle: &str) -> Result<u16, BoxError>;
}

/// The identity providers a collection validates against.
#[derive(Clone, Default)]
pub struct Validators {
    platform: Option<Arc<dyn AccountResolver>>,
    secondary: Option<Arc<dyn SecondaryAccountChecker>>,
}

impl Validators {
    /// No validation.
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_platform(mut self, resolver: Arc<dyn AccountResolver>) -> Self {
        self.platform = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_secondary(mut self, checker: Arc<dyn SecondaryAccountChecker>) -> Self {
        self.secondary = Some(checker);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.platform.is_none() && self.secondary.is_none()
    }

    /// Drop every linked account that cannot be confirmed.
    pub async fn validate(&self, member: Member) -> Member {
        let mut member = member;

        if let Some(resolver) = &self.platform {
            let mut kept = Vec::with_capacity(member.linked_platform_accounts().len());
            for handle in member.linked_platform_accounts() {
                if platform_account_is_valid(resolver.as_ref(), member.platform_username(), handle)
                    .await
                {
                    kept.push(handle.clone());
                }
            }
            member.set_linked_platform_accounts(kept);
        }

        if let Some(checker) = &self.secondary {
            let mut kept = Vec::with_capacity(member.linked_secondary_accounts().len());
            for handle in member.linked_secondary_accounts() {
                if secondary_account_is_valid(checker.as_ref(), member.platform_username(), handle)
                    .await
                {
                    kept.push(handle.clone());
                }
            }
            member.set_linked_secondary_accounts(kept);
        }

        member
    }
}

impl std::fmt::Debug for Validators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validators")
            .field("platform", &self.platform.is_some())
            .field("secondary", &self.secondary.is_some())
            .finish()
    }
}

async fn platform_account_is_valid(
    resolver: &dyn AccountResolver,
    username: &str,
    handle: &str,
) -> bool {
    match resolver.resolve_account(handle).await {
        Ok(Some(AccountKind::User)) if !handle.contains('/') => {
            debug!(username = %username, linked = %handle, "Linked platform account confirmed");
            true
        }
        Ok(Some(AccountKind::Repository)) => {
            warn!(
                username = %username,
                linked = %handle,
                "Linked platform account is a repository, dropping it"
            );
            false
        }
        Ok(Some(kind)) => {
            warn!(
                username = %username,
                linked = %handle,
                kind = ?kind,
                "Linked platform account is not a person, dropping it"
            );
            false
        }
        Ok(None) => {
            warn!(
                username = %username,
                linked = %handle,
                "Linked platform account does not exist, dropping it"
            );
            false
        }
        Err(e) => {
            warn!(
                username = %username,
                linked = %handle,
                error = %e,
                "Could not resolve linked platform account, dropping it"
            );
            false
        }
    }
}

async fn secondary_account_is_valid(
    checker: &dyn SecondaryAccountChecker,
    username: &str,
    handle: &str,
) -> bool {
    match checker.account_status(handle).await {
        Ok(status) if (200..300).contains(&status) => true,
        Ok(status) => {
            warn!(
                username = %username,
                linked = %handle,
                status,
                "Linked secondary account lookup failed, dropping it"
            );
            false
        }
        Err(e) => {
            warn!(
                username = %username,
                linked = %handle,
                error = %e,
                "Could not reach secondary service, dropping linked account"
            );
            false
        }
    }
}
