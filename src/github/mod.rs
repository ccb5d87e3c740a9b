pub mod types;

pub use types::{CreatedPullRequest, NewPullRequest, PullRequestInfo, Repository};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use types::{GitHubErrorResponse, GitHubPullRequest, GitHubRepository, GitHubStatus, GitHubUser};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const USER_AGENT_VALUE: &str = "revertomatic";

const STATUSES_PER_PAGE: usize = 100;

/// Failures talking to the hosting API.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

/// The remote calls the revert workflow needs from the hosting platform.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestInfo, ApiError>;

    /// Every status context recorded against `sha`, duplicates included.
    async fn list_status_contexts(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<String>, ApiError>;

    /// Login of the authenticated user.
    async fn current_user(&self) -> Result<String, ApiError>;

    /// `Ok(None)` when the repository does not exist.
    async fn get_repository(&self, owner: &str, name: &str)
        -> Result<Option<Repository>, ApiError>;

    /// Ask for a fork of `owner/repo` under the authenticated user.
    /// The fork may not be usable yet when this returns.
    async fn create_fork(&self, owner: &str, repo: &str) -> Result<(), ApiError>;

    async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        request: NewPullRequest,
    ) -> Result<CreatedPullRequest, ApiError>;
}

/// reqwest-backed GitHub REST client.
pub struct GitHubClient {
    client: Client,
    token: String,
    api_base: String,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            client,
            token: token.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| ApiError::Api {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            });
        }

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::AuthFailed(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            _ => ApiError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    #[instrument(skip(self))]
    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestInfo, ApiError> {
        let url = self.url(&format!("repos/{}/{}/pulls/{}", owner, repo, number));
        let pr: GitHubPullRequest = self.send(self.client.get(&url)).await?;
        debug!(title = %pr.title, "received PR metadata");
        Ok(pr.into())
    }

    #[instrument(skip(self))]
    async fn list_status_contexts(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<String>, ApiError> {
        let url = self.url(&format!("repos/{}/{}/commits/{}/statuses", owner, repo, sha));
        let mut contexts = Vec::new();
        let mut page = 1;
        loop {
            let request = self.client.get(&url).query(&[
                ("per_page", STATUSES_PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
            let statuses: Vec<GitHubStatus> = self.send(request).await?;
            let fetched = statuses.len();
            contexts.extend(statuses.into_iter().filter_map(|s| s.context));
            if fetched < STATUSES_PER_PAGE {
                break;
            }
            page += 1;
        }
        debug!(count = contexts.len(), "received status contexts");
        Ok(contexts)
    }

    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<String, ApiError> {
        let user: GitHubUser = self.send(self.client.get(self.url("user"))).await?;
        Ok(user.login)
    }

    #[instrument(skip(self))]
    async fn get_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Repository>, ApiError> {
        let url = self.url(&format!("repos/{}/{}", owner, name));
        match self.send::<GitHubRepository>(self.client.get(&url)).await {
            Ok(repo) => Ok(Some(repo.into())),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    async fn create_fork(&self, owner: &str, repo: &str) -> Result<(), ApiError> {
        let url = self.url(&format!("repos/{}/{}/forks", owner, repo));
        // GitHub answers 202 Accepted while the fork is still being created.
        let _: GitHubRepository = self
            .send(self.client.post(&url).json(&serde_json::json!({})))
            .await?;
        Ok(())
    }

    #[instrument(skip(self, request), fields(head = %request.head, base = %request.base))]
    async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        request: NewPullRequest,
    ) -> Result<CreatedPullRequest, ApiError> {
        let url = self.url(&format!("repos/{}/{}/pulls", owner, repo));
        self.send(self.client.post(&url).json(&request)).await
    }
}
