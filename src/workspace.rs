use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{info, instrument};

use crate::git::{GitError, Vcs};
use crate::github::Repository;
use crate::pr::PullRequest;

/// Remote names used in a clone this tool makes itself.
pub const UPSTREAM_REMOTE: &str = "origin";
pub const FORK_REMOTE: &str = "fork";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Failed to create temporary directory: {0}")]
    TempDir(#[from] io::Error),

    #[error(transparent)]
    Git(#[from] GitError),
}

/// A local repository a revert can be made in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopyHandle {
    pub local_path: PathBuf,
    /// Remote pointing at the repository the PR was merged into
    pub upstream_remote: String,
    /// Remote the revert branch is pushed to
    pub fork_remote: String,
}

/// Who owns the working copy decides whether it is removed afterwards.
#[derive(Debug)]
pub enum WorkingCopy {
    /// An existing checkout; never cleaned up by us.
    CallerSupplied(WorkingCopyHandle),
    /// A fresh clone in a temporary directory, deleted when dropped.
    Managed {
        dir: TempDir,
        handle: WorkingCopyHandle,
    },
}

impl WorkingCopy {
    pub fn handle(&self) -> &WorkingCopyHandle {
        match self {
            WorkingCopy::CallerSupplied(handle) => handle,
            WorkingCopy::Managed { handle, .. } => handle,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            WorkingCopy::CallerSupplied(handle) => &handle.local_path,
            WorkingCopy::Managed { dir, .. } => dir.path(),
        }
    }

    pub fn is_managed(&self) -> bool {
        matches!(self, WorkingCopy::Managed { .. })
    }

    /// Clone the PR's repository at its base branch into a new temporary
    /// directory and add `fork` as a second remote.
    #[instrument(skip_all, fields(repo = %pr.full_name(), base = %pr.base_branch))]
    pub async fn clone_managed(
        vcs: &dyn Vcs,
        pr: &PullRequest,
        fork: &Repository,
    ) -> Result<WorkingCopy, WorkspaceError> {
        let dir = tempfile::Builder::new().prefix("revertomatic_").tempdir()?;

        info!(dir = %dir.path().display(), "cloning upstream repository");
        vcs.clone_repo(&pr.clone_url, &pr.base_branch, dir.path()).await?;

        info!(url = %fork.ssh_url, "adding personal fork remote");
        vcs.add_remote(dir.path(), FORK_REMOTE, &fork.ssh_url).await?;

        let handle = WorkingCopyHandle {
            local_path: dir.path().to_path_buf(),
            upstream_remote: UPSTREAM_REMOTE.to_string(),
            fork_remote: FORK_REMOTE.to_string(),
        };
        Ok(WorkingCopy::Managed { dir, handle })
    }
}

pub fn revert_branch_name(pr_number: u64, timestamp_millis: i64) -> String {
    format!("revert-{}-{}", pr_number, timestamp_millis)
}

/// Branch name stamped with the current time. Two runs within the same
/// millisecond collide.
pub fn new_revert_branch_name(pr_number: u64) -> String {
    revert_branch_name(pr_number, chrono::Utc::now().timestamp_millis())
}

/// Fetch upstream and check out a new revert branch from its copy of the
/// PR's base branch. Returns the branch name.
#[instrument(skip_all, fields(dir = %handle.local_path.display(), pr = pr.number))]
pub async fn create_revert_branch(
    vcs: &dyn Vcs,
    handle: &WorkingCopyHandle,
    pr: &PullRequest,
) -> Result<String, GitError> {
    vcs.fetch(&handle.local_path, &handle.upstream_remote).await?;

    let branch = new_revert_branch_name(pr.number);
    let start_point = format!("{}/{}", handle.upstream_remote, pr.base_branch);
    info!(branch = %branch, start_point = %start_point, "creating revert branch");
    vcs.create_branch(&handle.local_path, &branch, &start_point).await?;
    Ok(branch)
}
