//! # Platform Connector
//!
//! REST client for the code-collaboration platform hosting the
//! organization: membership listings, profiles, file content, issues and
//! pull-request reviews.
//!
//! [`PlatformClient`] is the seam reconciliation depends on; [`GithubClient`]
//! is the HTTP implementation.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod platform;

pub use client::GithubClient;
pub use config::GithubConfig;
pub use error::{GithubError, GithubResult};
pub use models::{GithubUser, Issue, Repository, ReviewEvent, Team};
pub use platform::{PlatformClient, PlatformResolver};
