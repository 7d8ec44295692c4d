//! # Roster Core
//!
//! Member records and the keyed collections that hold them.
//!
//! A collection maps platform usernames (case-insensitive) to member
//! records and is bound to the CSV file it was read from. Two collections
//! take part in every reconciliation run: the directory-confirmed one and the
//! supplementary one.
//!
//! ## Example
//!
//! ```ignore
//! use roster_core::{store, Member, Source};
//!
//! let mut members = store::read_collection("ldap.csv")?;
//! members.put(Member::new("alice", Source::Manual)?).await;
//! store::write_collection(&members)?;
//! ```

pub mod collection;
pub mod error;
pub mod member;
pub mod normalize;
pub mod store;
pub mod validate;

// Re-exports
pub use collection::MemberCollection;
pub use error::{BoxError, RosterError, RosterResult};
pub use member::{email_local_part, Member, ProfileSnapshot, Source};
pub use normalize::{normalize_accounts, remove_domain_name};
pub use validate::{AccountKind, AccountResolver, SecondaryAccountChecker, Validators};
