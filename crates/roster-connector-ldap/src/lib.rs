//! # Corporate Directory Connector
//!
//! Read-only searches against the corporate LDAP directory.
//!
//! Callers open a [`DirectorySearchClient`] from a [`DirectoryConnector`],
//! run their lookups, and close or drop it. Lookups identify at most one
//! person.
//!
//! ## Example
//!
//! ```ignore
//! use roster_connector_ldap::{DirectoryConfig, DirectoryConnector, LdapDirectory};
//!
//! let directory = LdapDirectory::new(DirectoryConfig::new("ldap.corp.example", "dc=corp"))?;
//! let mut client = directory.open().await?;
//! let email = client.search_uid("alice", "mail").await?;
//! client.close().await?;
//! ```

pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod filter;
pub mod ldap;
pub mod memory;

// Re-exports
pub use client::{DirectoryConnector, DirectorySearchClient, DirectorySession, MatchMode};
pub use config::{DirectoryAttributes, DirectoryConfig, SocialProfiles, SocialService};
pub use entry::{DirectoryEntry, DirectoryRecord};
pub use error::{DirectoryError, DirectoryResult};
pub use filter::{escape_ldap_value, Filter};
pub use ldap::LdapDirectory;
pub use memory::InMemoryDirectory;
