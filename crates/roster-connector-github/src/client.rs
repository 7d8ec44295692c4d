//! Platform REST client with pagination and transient-error retries.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use roster_core::AccountKind;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::GithubConfig;
use crate::error::{GithubError, GithubResult};
use crate::models::{
    account_kind, AccountSummary, ApiErrorBody, CommentRequest, ContentResponse, GithubUser,
    Issue, LabelsRequest, NewIssue, Repository, ReviewEvent, ReviewRequest, Team,
};
use crate::platform::PlatformClient;

/// Platform API client.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http_client: reqwest::Client,
    config: GithubConfig,
}

impl GithubClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn new(config: GithubConfig) -> GithubResult<Self> {
        config.validate()?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GithubError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// API base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .http_client
            .request(method, format!("{}{}", self.base_url(), path))
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send, retrying 502/503/504 with exponential backoff.
    async fn send<F>(&self, build: F) -> GithubResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut delay = Duration::from_secs(1);

        loop {
            let response = build().send().await?;
            let status = response.status();

            if matches!(
                status,
                StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
            ) && retries < self.config.max_retries
            {
                retries += 1;
                warn!(
                    "Transient error {}, retry {}/{} after {:?}",
                    status, retries, self.config.max_retries, delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                continue;
            }

            return Ok(response);
        }
    }

    async fn api_error(response: Response) -> GithubError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);
        GithubError::Api { status, message }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> GithubResult<T> {
        let response = self
            .send(|| self.request(Method::GET, path).query(query))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GithubError::NotFound(path.to_string()));
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// GET that maps 404 to `None`.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> GithubResult<Option<T>> {
        match self.get_json(path, &[]).await {
            Ok(value) => Ok(Some(value)),
            Err(GithubError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn post_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> GithubResult<Response> {
        let response = self
            .send(|| self.request(Method::POST, path).json(body))
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response)
    }

    /// Fetch every page of a list endpoint until a short page.
    #[instrument(skip(self, query))]
    async fn get_paginated<T: DeserializeOwned + Send>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> GithubResult<Vec<T>> {
        let per_page = self.config.per_page as usize;
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let mut params = query.to_vec();
            params.push(("per_page", per_page.to_string()));
            params.push(("page", page.to_string()));

            let batch: Vec<T> = self.get_json(path, &params).await?;
            let short = batch.len() < per_page;
            items.extend(batch);
            if short {
                break;
            }
            page += 1;
        }

        debug!(path, count = items.len(), pages = page, "Fetched paginated list");
        Ok(items)
    }

    async fn list_logins(&self, path: &str) -> GithubResult<Vec<String>> {
        let accounts: Vec<AccountSummary> = self.get_paginated(path, &[]).await?;
        Ok(accounts.into_iter().map(|a| a.login).collect())
    }
}

#[async_trait]
impl PlatformClient for GithubClient {
    #[instrument(skip(self))]
    async fn list_org_members(&self, org: &str) -> GithubResult<Vec<String>> {
        self.list_logins(&format!("/orgs/{org}/members")).await
    }

    #[instrument(skip(self))]
    async fn list_teams(&self, org: &str) -> GithubResult<Vec<Team>> {
        self.get_paginated(&format!("/orgs/{org}/teams"), &[]).await
    }

    #[instrument(skip(self))]
    async fn list_team_members(&self, org: &str, team_slug: &str) -> GithubResult<Vec<String>> {
        self.list_logins(&format!("/orgs/{org}/teams/{team_slug}/members"))
            .await
    }

    #[instrument(skip(self))]
    async fn list_repositories(&self, org: &str) -> GithubResult<Vec<Repository>> {
        self.get_paginated(&format!("/orgs/{org}/repos"), &[]).await
    }

    #[instrument(skip(self))]
    async fn list_repository_collaborators(&self, repo: &str) -> GithubResult<Vec<String>> {
        self.list_logins(&format!("/repos/{repo}/collaborators"))
            .await
    }

    #[instrument(skip(self))]
    async fn get_user(&self, login: &str) -> GithubResult<Option<GithubUser>> {
        self.get_optional(&format!("/users/{login}")).await
    }

    #[instrument(skip(self))]
    async fn resolve_account(&self, handle: &str) -> GithubResult<Option<AccountKind>> {
        if handle.contains('/') {
            let repo: Option<Repository> = self.get_optional(&format!("/repos/{handle}")).await?;
            return Ok(repo.map(|_| AccountKind::Repository));
        }

        let account: Option<AccountSummary> =
            self.get_optional(&format!("/users/{handle}")).await?;
        Ok(account.and_then(|a| a.kind.as_deref().and_then(account_kind)))
    }

    #[instrument(skip(self))]
    async fn get_file_content(
        &self,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> GithubResult<String> {
        let content: ContentResponse = self
            .get_json(
                &format!("/repos/{repo}/contents/{path}"),
                &[("ref", git_ref.to_string())],
            )
            .await?;

        if !content.encoding.is_empty() && content.encoding != "base64" {
            return Err(GithubError::Decode(format!(
                "unsupported encoding '{}'",
                content.encoding
            )));
        }

        let compact: String = content
            .content
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| GithubError::Decode(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| GithubError::Decode(e.to_string()))
    }

    #[instrument(skip(self))]
    async fn find_open_issue(&self, repo: &str, label: &str) -> GithubResult<Option<Issue>> {
        let issues: Vec<Issue> = self
            .get_json(
                &format!("/repos/{repo}/issues"),
                &[("state", "open".to_string()), ("labels", label.to_string())],
            )
            .await?;
        Ok(issues.into_iter().find(|i| !i.is_pull_request()))
    }

    #[instrument(skip(self, body))]
    async fn create_issue(&self, repo: &str, title: &str, body: &str) -> GithubResult<Issue> {
        let response = self
            .post_json(&format!("/repos/{repo}/issues"), &NewIssue { title, body })
            .await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self))]
    async fn add_labels(&self, repo: &str, number: u64, labels: &[String]) -> GithubResult<()> {
        self.post_json(
            &format!("/repos/{repo}/issues/{number}/labels"),
            &LabelsRequest { labels },
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, body))]
    async fn comment_issue(&self, repo: &str, number: u64, body: &str) -> GithubResult<()> {
        self.post_json(
            &format!("/repos/{repo}/issues/{number}/comments"),
            &CommentRequest { body },
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, body))]
    async fn create_review(
        &self,
        repo: &str,
        pull_number: u64,
        body: &str,
        event: ReviewEvent,
    ) -> GithubResult<()> {
        self.post_json(
            &format!("/repos/{repo}/pulls/{pull_number}/reviews"),
            &ReviewRequest { body, event },
        )
        .await?;
        Ok(())
    }
}
