pub mod types;

pub use types::{PrUrl, PullRequest};

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::github::{ApiError, GitHubApi};

#[derive(Debug, Error)]
pub enum PrError {
    #[error("Invalid PR URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to look up PR: {0}")]
    Lookup(#[from] ApiError),
}

/// Parse a PR URL into its component parts.
///
/// Expected format: [https://]{host}/{owner}/{repo}/pull/{number}. Any host
/// is accepted so GitHub Enterprise links work; trailing segments (e.g.
/// `/files`) are ignored.
pub fn parse_pr_url(url: &str) -> Result<PrUrl, PrError> {
    let invalid = || PrError::InvalidUrl(url.to_string());
    let parsed = if url.contains("://") {
        reqwest::Url::parse(url)
    } else {
        reqwest::Url::parse(&format!("https://{}", url))
    }
    .map_err(|_| invalid())?;

    let segments: Vec<_> = parsed.path().trim_matches('/').split('/').collect();
    if segments.len() < 4 || segments[2] != "pull" {
        return Err(invalid());
    }
    if segments[0].is_empty() || segments[1].is_empty() {
        return Err(invalid());
    }

    let pr_number = segments[3].parse::<u64>().map_err(|_| invalid())?;
    if pr_number == 0 {
        return Err(invalid());
    }

    Ok(PrUrl {
        owner: segments[0].to_string(),
        repo: segments[1].to_string(),
        pr_number,
    })
}

/// Parse `url` and fetch the PR it points at. Exactly one API call on a
/// well-formed URL, none otherwise.
#[instrument(skip(api))]
pub async fn resolve(api: &dyn GitHubApi, url: &str) -> Result<PullRequest, PrError> {
    let pr_url = parse_pr_url(url)?;

    let info = api
        .get_pull_request(&pr_url.owner, &pr_url.repo, pr_url.pr_number)
        .await
        .map_err(|e| {
            warn!(owner = %pr_url.owner, repo = %pr_url.repo, pr = pr_url.pr_number, error = %e, "failed to get PR");
            e
        })?;

    info!(owner = %pr_url.owner, repo = %pr_url.repo, pr = pr_url.pr_number, url = %info.html_url, "found info for PR");

    Ok(PullRequest {
        owner: pr_url.owner,
        repo: pr_url.repo,
        number: pr_url.pr_number,
        title: info.title,
        author: info.author,
        merge_commit_sha: info.merge_commit_sha.unwrap_or_default(),
        base_branch: info.base_branch,
        clone_url: info.base_clone_url,
    })
}
