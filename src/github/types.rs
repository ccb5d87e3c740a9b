use serde::{Deserialize, Serialize};

/// Pull request as reported by the hosting API.
#[derive(Debug, Clone, Default)]
pub struct PullRequestInfo {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub merge_commit_sha: Option<String>,
    /// Latest commit on the PR's head branch
    pub head_sha: Option<String>,
    pub base_branch: String,
    /// Clone URL of the base repository
    pub base_clone_url: String,
    pub html_url: String,
}

/// A repository, as far as forking cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
    /// SSH remote URL, used as the push target
    pub ssh_url: String,
}

/// Request to open a pull request.
#[derive(Debug, Clone, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    /// `user:branch` when the branch lives in a fork
    pub head: String,
    pub base: String,
    pub body: String,
    pub maintainer_can_modify: bool,
}

/// A freshly opened pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPullRequest {
    pub number: u64,
    pub html_url: String,
}

// Wire formats of the GitHub REST API. Only the fields in use are declared.

#[derive(Debug, Deserialize)]
pub(super) struct GitHubUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct GitHubRepository {
    pub name: String,
    pub owner: GitHubUser,
    pub ssh_url: String,
}

impl From<GitHubRepository> for Repository {
    fn from(repo: GitHubRepository) -> Self {
        Repository {
            owner: repo.owner.login,
            name: repo.name,
            ssh_url: repo.ssh_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GitHubHead {
    pub sha: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GitHubBaseRepo {
    pub clone_url: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct GitHubBase {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub repo: GitHubBaseRepo,
}

#[derive(Debug, Deserialize)]
pub(super) struct GitHubPullRequest {
    pub number: u64,
    pub title: String,
    pub user: GitHubUser,
    /// Missing counts as not merged
    #[serde(default)]
    pub merged: Option<bool>,
    /// Also set on open PRs, where it names the test merge commit
    pub merge_commit_sha: Option<String>,
    pub head: Option<GitHubHead>,
    pub base: GitHubBase,
    pub html_url: String,
}

impl From<GitHubPullRequest> for PullRequestInfo {
    fn from(pr: GitHubPullRequest) -> Self {
        let merge_commit_sha = if pr.merged.unwrap_or(false) {
            pr.merge_commit_sha
        } else {
            None
        };
        PullRequestInfo {
            number: pr.number,
            title: pr.title,
            author: pr.user.login,
            merge_commit_sha,
            head_sha: pr.head.and_then(|h| h.sha),
            base_branch: pr.base.ref_name,
            base_clone_url: pr.base.repo.clone_url,
            html_url: pr.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct GitHubStatus {
    pub context: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GitHubErrorResponse {
    pub message: String,
}
