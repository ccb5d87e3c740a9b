use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Failed to run `git {command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`git {command}` failed ({status})")]
    Failed { command: String, status: String },

    #[error("Revert of {sha} did not apply cleanly; resolve the conflict by hand")]
    Conflict { sha: String },
}

/// The version-control operations a revert needs. Every call names the
/// repository directory it acts on.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Clone `url` at `branch` into the (empty) directory `dir`.
    async fn clone_repo(&self, url: &str, branch: &str, dir: &Path) -> Result<(), GitError>;

    async fn add_remote(&self, dir: &Path, name: &str, url: &str) -> Result<(), GitError>;

    async fn fetch(&self, dir: &Path, remote: &str) -> Result<(), GitError>;

    /// Create `branch` from `start_point` and check it out.
    async fn create_branch(&self, dir: &Path, branch: &str, start_point: &str) -> Result<(), GitError>;

    /// Revert merge commit `sha` against its first parent, keeping git's message.
    async fn revert_commit(&self, dir: &Path, sha: &str) -> Result<(), GitError>;

    /// Push `branch` to the same name on `remote`.
    async fn push(&self, dir: &Path, remote: &str, branch: &str) -> Result<(), GitError>;
}

/// Runs the `git` executable on tokio's process driver. Success is judged on
/// exit status alone.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::with_program("git")
    }
}

impl GitCli {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<(), GitError> {
        let command = args.join(" ");
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdin(Stdio::null())
            // git's chatter goes to stderr with our logs; stdout carries results
            .stdout(Stdio::from(io::stderr()))
            .stderr(Stdio::inherit());
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        debug!(command = %command, dir = ?dir, "running git");
        let status = cmd.status().await.map_err(|source| GitError::Spawn {
            command: command.clone(),
            source,
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(GitError::Failed {
                command,
                status: status.to_string(),
            })
        }
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn clone_repo(&self, url: &str, branch: &str, dir: &Path) -> Result<(), GitError> {
        let dir = dir.to_string_lossy();
        self.run(None, &["clone", "-b", branch, url, &dir]).await
    }

    async fn add_remote(&self, dir: &Path, name: &str, url: &str) -> Result<(), GitError> {
        self.run(Some(dir), &["remote", "add", name, url]).await
    }

    async fn fetch(&self, dir: &Path, remote: &str) -> Result<(), GitError> {
        self.run(Some(dir), &["fetch", remote]).await
    }

    async fn create_branch(&self, dir: &Path, branch: &str, start_point: &str) -> Result<(), GitError> {
        self.run(Some(dir), &["checkout", "-b", branch, start_point]).await
    }

    async fn revert_commit(&self, dir: &Path, sha: &str) -> Result<(), GitError> {
        match self.run(Some(dir), &["revert", "-m1", "--no-edit", sha]).await {
            Err(GitError::Failed { .. }) => Err(GitError::Conflict {
                sha: sha.to_string(),
            }),
            other => other,
        }
    }

    async fn push(&self, dir: &Path, remote: &str, branch: &str) -> Result<(), GitError> {
        let refspec = format!("{}:{}", branch, branch);
        self.run(Some(dir), &["push", remote, &refspec]).await
    }
}
