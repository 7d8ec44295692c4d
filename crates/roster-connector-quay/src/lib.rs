//! # Registry Connector
//!
//! Looks up user accounts on the container registry. Only the HTTP status
//! matters: a 2xx answer confirms a linked registry account.

use std::time::Duration;

use async_trait::async_trait;
use roster_core::{BoxError, SecondaryAccountChecker};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// Result type alias using `QuayError`.
pub type QuayResult<T> = Result<T, QuayError>;

#[derive(Debug, Error)]
pub enum QuayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Registry client configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct QuayConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Application token. Usually supplied through `QUAY_TOKEN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Validate linked registry accounts at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for QuayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuayConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "***REDACTED***"))
            .field("enabled", &self.enabled)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_api_url() -> String {
    "https://quay.io/api/v1".to_string()
}

fn default_enabled() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for QuayConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            enabled: default_enabled(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Registry API client.
#[derive(Debug, Clone)]
pub struct QuayClient {
    http_client: reqwest::Client,
    config: QuayConfig,
}

impl QuayClient {
    pub fn new(config: QuayConfig) -> QuayResult<Self> {
        if config.api_url.trim().is_empty() {
            return Err(QuayError::Config("api_url is required".to_string()));
        }
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| QuayError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Status of `GET /users/{handle}`.
    #[instrument(skip(self))]
    pub async fn get_user(&self, handle: &str) -> QuayResult<u16> {
        let url = format!(
            "{}/users/{}",
            self.config.api_url.trim_end_matches('/'),
            handle
        );
        let mut request = self.http_client.get(&url);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let status = request.send().await?.status().as_u16();
        debug!(handle, status, "Registry user lookup");
        Ok(status)
    }
}

#[async_trait]
impl SecondaryAccountChecker for QuayClient {
    async fn account_status(&self, handle: &str) -> Result<u16, BoxError> {
        Ok(self.get_user(handle).await?)
    }
}
