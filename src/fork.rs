use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::github::{ApiError, GitHubApi, Repository};
use crate::pr::PullRequest;
use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ForkError {
    #[error("Failed to look up fork: {0}")]
    Lookup(#[from] ApiError),

    #[error("Fork {owner}/{name} did not become available after {attempts} checks")]
    Unavailable {
        owner: String,
        name: String,
        attempts: u32,
    },
}

/// Make sure `user` has a fork of the PR's repository and return it.
///
/// An existing repository with the same name under `user` is taken as the fork
/// as-is. Otherwise a fork is requested and polled for under `policy`, since
/// GitHub creates forks asynchronously.
#[instrument(skip(api, pr, policy), fields(repo = %pr.full_name()))]
pub async fn ensure_fork(
    api: &dyn GitHubApi,
    pr: &PullRequest,
    user: &str,
    policy: &RetryPolicy,
) -> Result<Repository, ForkError> {
    if let Some(fork) = api.get_repository(user, &pr.repo).await? {
        info!(fork = %format!("{}/{}", fork.owner, fork.name), "fork already exists");
        return Ok(fork);
    }

    info!("fork not found, creating one");
    api.create_fork(&pr.owner, &pr.repo).await?;

    let fork = policy
        .poll(move || async move {
            match api.get_repository(user, &pr.repo).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(error = %e, "fork lookup failed, will retry");
                    None
                }
            }
        })
        .await;

    match fork {
        Some(fork) => {
            info!(fork = %format!("{}/{}", fork.owner, fork.name), "fork is ready");
            Ok(fork)
        }
        None => {
            warn!(attempts = policy.max_attempts, "fork failed to become available");
            Err(ForkError::Unavailable {
                owner: user.to_string(),
                name: pr.repo.clone(),
                attempts: policy.max_attempts.max(1),
            })
        }
    }
}
