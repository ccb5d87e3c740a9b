use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, info_span, instrument, Instrument};

use crate::fork::{self, ForkError};
use crate::git::{GitError, Vcs};
use crate::github::{ApiError, CreatedPullRequest, GitHubApi, NewPullRequest};
use crate::pr::{self, PrError, PullRequest};
use crate::report;
use crate::retry::RetryPolicy;
use crate::status::{self, StatusError, StatusFilter};
use crate::workspace::{self, WorkingCopy, WorkingCopyHandle, WorkspaceError};

/// Everything that can end a revert run. Each variant carries the failing
/// step's own error.
#[derive(Debug, Error)]
pub enum RevertError {
    #[error(transparent)]
    Pr(#[from] PrError),

    #[error("PR #{0} has not been merged; there is nothing to revert")]
    NotMerged(u64),

    #[error("GitHub request failed: {0}")]
    Api(#[from] ApiError),

    #[error(transparent)]
    Fork(#[from] ForkError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Status(#[from] StatusError),
}

/// Inputs for one revert run.
#[derive(Debug, Clone)]
pub struct RevertRequest {
    pub pr_url: String,
    /// Tracking ticket, e.g. `OCPBUGS-1234`
    pub jira: String,
    /// Why the change is being reverted
    pub context: String,
    /// Jobs to run before un-reverting
    pub jobs: String,
    /// Existing checkout to work in instead of a fresh clone
    pub working_copy: Option<WorkingCopyHandle>,
}

#[derive(Debug, Clone)]
pub struct RevertOutcome {
    pub reverted: PullRequest,
    pub created: CreatedPullRequest,
    pub branch: String,
    /// Overridable contexts of the reverted PR
    pub overridable: HashSet<String>,
}

/// Revert the merge commit on `handle`'s checked-out branch and push the
/// branch to the fork remote.
#[instrument(skip_all, fields(sha = %pr.merge_commit_sha, branch = %branch))]
pub async fn revert_and_push(
    vcs: &dyn Vcs,
    handle: &WorkingCopyHandle,
    pr: &PullRequest,
    branch: &str,
) -> Result<(), GitError> {
    info!("reverting merge commit");
    vcs.revert_commit(&handle.local_path, &pr.merge_commit_sha).await?;

    info!(remote = %handle.fork_remote, "pushing revert branch");
    vcs.push(&handle.local_path, &handle.fork_remote, branch).await
}

/// Runs the revert workflow start to finish against the given GitHub and git
/// capabilities. Steps run strictly one after another; the first failure
/// ends the run.
pub struct Reverter<'a> {
    api: &'a dyn GitHubApi,
    vcs: &'a dyn Vcs,
    fork_policy: RetryPolicy,
    status_filter: StatusFilter,
}

impl<'a> Reverter<'a> {
    pub fn new(api: &'a dyn GitHubApi, vcs: &'a dyn Vcs) -> Self {
        Self {
            api,
            vcs,
            fork_policy: RetryPolicy::default(),
            status_filter: StatusFilter::default(),
        }
    }

    pub fn with_fork_policy(mut self, policy: RetryPolicy) -> Self {
        self.fork_policy = policy;
        self
    }

    pub fn with_status_filter(mut self, filter: StatusFilter) -> Self {
        self.status_filter = filter;
        self
    }

    pub async fn run(&self, request: RevertRequest) -> Result<RevertOutcome, RevertError> {
        let span = info_span!("revert", pr_url = %request.pr_url, jira = %request.jira);
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: RevertRequest) -> Result<RevertOutcome, RevertError> {
        let pr = pr::resolve(self.api, &request.pr_url).await?;
        if !pr.is_merged() {
            return Err(RevertError::NotMerged(pr.number));
        }

        let user = self.api.current_user().await?;
        info!(user = %user, "acting as GitHub user");

        // Dropping a managed copy deletes its directory, on every exit path.
        let working_copy = match request.working_copy {
            Some(handle) => {
                info!(dir = %handle.local_path.display(), "using existing local repository");
                WorkingCopy::CallerSupplied(handle)
            }
            None => {
                let fork = fork::ensure_fork(self.api, &pr, &user, &self.fork_policy).await?;
                WorkingCopy::clone_managed(self.vcs, &pr, &fork).await?
            }
        };
        info!(managed = working_copy.is_managed(), dir = %working_copy.path().display(), "working copy ready");
        let handle = working_copy.handle();

        let branch = workspace::create_revert_branch(self.vcs, handle, &pr).await?;
        revert_and_push(self.vcs, handle, &pr, &branch).await?;
        drop(working_copy);

        let body = report::render_body(&pr, &request.jira, &request.context, &request.jobs);
        let created = self
            .api
            .create_pull_request(
                &pr.owner,
                &pr.repo,
                NewPullRequest {
                    title: report::revert_title(&pr, &request.jira),
                    head: format!("{}:{}", user, branch),
                    base: pr.base_branch.clone(),
                    body,
                    maintainer_can_modify: true,
                },
            )
            .await?;
        info!(url = %created.html_url, "revert PR created");

        // The revert PR stays open even if this lookup fails.
        let overridable = status::overridable_statuses(self.api, &self.status_filter, &pr).await?;

        Ok(RevertOutcome {
            reverted: pr,
            created,
            branch,
            overridable,
        })
    }

    /// Overridable statuses for the PR at `pr_url`, without reverting anything.
    pub async fn overrides(&self, pr_url: &str) -> Result<HashSet<String>, RevertError> {
        let pr = pr::resolve(self.api, pr_url).await?;
        Ok(status::overridable_statuses(self.api, &self.status_filter, &pr).await?)
    }
}
