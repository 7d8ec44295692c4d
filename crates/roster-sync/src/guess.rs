//! Identity guessing
//!
//! Resolves a platform account to a corporate email by trying directory
//! filters in a fixed order. Each strategy is a pure function from the
//! member to an optional filter; the first filter that finds an email wins.

use roster_connector_ldap::{
    DirectoryResult, DirectorySearchClient, Filter, MatchMode, SocialService,
};
use roster_core::Member;
use tracing::{debug, instrument};

use crate::config::CorporateConfig;

/// One way of finding a member in the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessStrategy {
    /// Social-profile value equal to the platform username.
    ExactSocial,
    /// Public profile email, when it is a corporate address.
    ProfileEmail,
    /// Profile display name taken as a directory account id.
    LoginAsUid,
    /// Profile display name equal to the directory person name.
    DisplayName,
}

impl GuessStrategy {
    /// Strategies in the order they are tried.
    pub const ORDER: [GuessStrategy; 4] = [
        GuessStrategy::ExactSocial,
        GuessStrategy::ProfileEmail,
        GuessStrategy::LoginAsUid,
        GuessStrategy::DisplayName,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GuessStrategy::ExactSocial => "exact-social",
            GuessStrategy::ProfileEmail => "profile-email",
            GuessStrategy::LoginAsUid => "login-as-uid",
            GuessStrategy::DisplayName => "display-name",
        }
    }

    /// Filter this strategy would search with, if it applies to `member`.
    pub fn filter(
        &self,
        client: &DirectorySearchClient,
        corporate: &CorporateConfig,
        member: &Member,
    ) -> Option<Filter> {
        let profile = member.profile();
        let display_name = profile
            .and_then(|p| p.name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty());

        match self {
            GuessStrategy::ExactSocial => Some(client.social_filter(
                SocialService::Platform,
                member.platform_username(),
                MatchMode::Exact,
            )),
            GuessStrategy::ProfileEmail => profile
                .and_then(|p| p.email.as_deref())
                .map(str::trim)
                .filter(|email| corporate.is_corporate_email(email))
                .map(|email| client.email_filter(email)),
            GuessStrategy::LoginAsUid => display_name.map(|name| client.uid_filter(name)),
            GuessStrategy::DisplayName => display_name.map(|name| client.name_filter(name)),
        }
    }
}

/// Result of guessing one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessOutcome {
    /// A strategy found the corporate email; it is attached to the member.
    Resolved {
        member: Member,
        strategy: GuessStrategy,
    },
    /// No strategy matched, but the profile names the corporation as employer.
    KnownEmployer(Member),
    /// Nothing matched.
    Unresolved(Member),
}

impl GuessOutcome {
    pub fn member(&self) -> &Member {
        match self {
            GuessOutcome::Resolved { member, .. }
            | GuessOutcome::KnownEmployer(member)
            | GuessOutcome::Unresolved(member) => member,
        }
    }

    pub fn into_member(self) -> Member {
        match self {
            GuessOutcome::Resolved { member, .. }
            | GuessOutcome::KnownEmployer(member)
            | GuessOutcome::Unresolved(member) => member,
        }
    }
}

/// Try every strategy in order, stopping at the first email found.
///
/// Directory faults are returned as-is; the caller checks connectivity
/// before guessing and nothing here reconnects.
#[instrument(skip_all, fields(username = %member.platform_username()))]
pub async fn attempt(
    client: &mut DirectorySearchClient,
    corporate: &CorporateConfig,
    member: Member,
) -> DirectoryResult<GuessOutcome> {
    let email_attribute = client.config().attributes.email.clone();

    for strategy in GuessStrategy::ORDER {
        let Some(filter) = strategy.filter(client, corporate, &member) else {
            continue;
        };
        if let Some(email) = client.find_attribute(&filter, &email_attribute).await? {
            debug!(strategy = strategy.name(), email = %email, "Guessed identity");
            return Ok(GuessOutcome::Resolved {
                member: member.with_email(Some(email)),
                strategy,
            });
        }
    }

    Ok(classify_unmatched(corporate, member))
}

/// Outcome for a member no directory lookup matched.
pub fn classify_unmatched(corporate: &CorporateConfig, member: Member) -> GuessOutcome {
    let employer = member
        .profile()
        .and_then(|p| p.company.as_deref())
        .is_some_and(|company| corporate.is_corporate_employer(company));

    if employer {
        GuessOutcome::KnownEmployer(member)
    } else {
        GuessOutcome::Unresolved(member)
    }
}
