//! In-memory stand-ins for GitHub and git used by unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::git::{GitError, Vcs};
use crate::github::{
    ApiError, CreatedPullRequest, GitHubApi, NewPullRequest, PullRequestInfo, Repository,
};
use crate::pr::PullRequest;
use crate::retry::RetryPolicy;

/// PR 7 on `o/r`, merged into `main` by `abc123`, authored by `alice`.
/// Its head branch ended at `def456`.
pub fn sample_pull_request() -> PullRequest {
    PullRequest {
        owner: "o".to_string(),
        repo: "r".to_string(),
        number: 7,
        title: "Bump deps".to_string(),
        author: "alice".to_string(),
        merge_commit_sha: "abc123".to_string(),
        base_branch: "main".to_string(),
        clone_url: "https://github.com/o/r.git".to_string(),
    }
}

pub fn sample_fork() -> Repository {
    repository("bob", "r")
}

pub fn fast_retry_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(1),
        factor: 1.5,
        jitter: 0.2,
    }
}

fn repository(owner: &str, name: &str) -> Repository {
    Repository {
        owner: owner.to_string(),
        name: name.to_string(),
        ssh_url: format!("git@github.com:{}/{}.git", owner, name),
    }
}

fn sample_pull_request_info() -> PullRequestInfo {
    PullRequestInfo {
        number: 7,
        title: "Bump deps".to_string(),
        author: "alice".to_string(),
        merge_commit_sha: Some("abc123".to_string()),
        head_sha: Some("def456".to_string()),
        base_branch: "main".to_string(),
        base_clone_url: "https://github.com/o/r.git".to_string(),
        html_url: "https://github.com/o/r/pull/7".to_string(),
    }
}

/// Fork requested through `create_fork` that shows up after some lookups.
#[derive(Debug)]
struct PendingFork {
    owner: String,
    name: String,
    misses_left: u32,
}

#[derive(Debug)]
struct FakeGitHubInner {
    login: String,
    pull_requests: HashMap<(String, String, u64), PullRequestInfo>,
    statuses: HashMap<String, Vec<String>>,
    repositories: HashMap<(String, String), Repository>,
    fork_delay: u32,
    pending_fork: Option<PendingFork>,
    create_fork_error: Option<ApiError>,
    list_statuses_error: Option<ApiError>,
    status_lookups: Vec<String>,
    created: Vec<(String, String, NewPullRequest)>,
    calls: Vec<String>,
}

/// GitHub fake acting as user `bob`, holding PR `o/r#7` and the statuses of
/// its head commit.
#[derive(Debug)]
pub struct FakeGitHub {
    inner: Mutex<FakeGitHubInner>,
}

impl FakeGitHub {
    pub fn new() -> Self {
        let mut pull_requests = HashMap::new();
        pull_requests.insert(
            ("o".to_string(), "r".to_string(), 7),
            sample_pull_request_info(),
        );

        let mut statuses = HashMap::new();
        statuses.insert(
            "def456".to_string(),
            [
                "ci/prow/unit",
                "ci/prow/e2e-aws",
                "ci/prow/lint",
                "ci/prow/e2e-aws",
                "ci/prow/images",
                "ci/prow/verify-deps",
                "tide",
                "ci/prow/e2e-gcp",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );

        Self {
            inner: Mutex::new(FakeGitHubInner {
                login: "bob".to_string(),
                pull_requests,
                statuses,
                repositories: HashMap::new(),
                fork_delay: 0,
                pending_fork: None,
                create_fork_error: None,
                list_statuses_error: None,
                status_lookups: Vec::new(),
                created: Vec::new(),
                calls: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeGitHubInner> {
        self.inner.lock().unwrap()
    }

    /// Store a PR built by editing the default PR 7 info.
    pub fn with_pull_request(&self, owner: &str, repo: &str, edit: impl FnOnce(&mut PullRequestInfo)) {
        let mut info = sample_pull_request_info();
        edit(&mut info);
        self.lock()
            .pull_requests
            .insert((owner.to_string(), repo.to_string(), info.number), info);
    }

    pub fn set_statuses(&self, sha: &str, contexts: &[&str]) {
        self.lock().statuses.insert(
            sha.to_string(),
            contexts.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn add_repository(&self, owner: &str, name: &str) {
        self.lock()
            .repositories
            .insert((owner.to_string(), name.to_string()), repository(owner, name));
    }

    /// Forks requested from now on miss `misses` lookups before appearing.
    pub fn fork_ready_after(&self, misses: u32) {
        self.lock().fork_delay = misses;
    }

    pub fn fail_create_fork(&self, err: ApiError) {
        self.lock().create_fork_error = Some(err);
    }

    pub fn fail_list_statuses(&self, err: ApiError) {
        self.lock().list_statuses_error = Some(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> usize {
        self.lock().calls.iter().filter(|c| *c == method).count()
    }

    /// Commits whose statuses were listed, in order.
    pub fn status_lookups(&self) -> Vec<String> {
        self.lock().status_lookups.clone()
    }

    pub fn created_pull_requests(&self) -> Vec<(String, String, NewPullRequest)> {
        self.lock().created.clone()
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestInfo, ApiError> {
        let mut inner = self.lock();
        inner.calls.push("get_pull_request".to_string());
        inner
            .pull_requests
            .get(&(owner.to_string(), repo.to_string(), number))
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("{}/{}#{}", owner, repo, number)))
    }

    async fn list_status_contexts(
        &self,
        _owner: &str,
        _repo: &str,
        sha: &str,
    ) -> Result<Vec<String>, ApiError> {
        let mut inner = self.lock();
        inner.calls.push("list_status_contexts".to_string());
        inner.status_lookups.push(sha.to_string());
        if let Some(err) = inner.list_statuses_error.clone() {
            return Err(err);
        }
        Ok(inner.statuses.get(sha).cloned().unwrap_or_default())
    }

    async fn current_user(&self) -> Result<String, ApiError> {
        let mut inner = self.lock();
        inner.calls.push("current_user".to_string());
        Ok(inner.login.clone())
    }

    async fn get_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<Repository>, ApiError> {
        let mut inner = self.lock();
        inner.calls.push("get_repository".to_string());

        let key = (owner.to_string(), name.to_string());
        if let Some(repo) = inner.repositories.get(&key) {
            return Ok(Some(repo.clone()));
        }

        let ready = match inner.pending_fork.as_mut() {
            Some(pending) if pending.owner == owner && pending.name == name => {
                if pending.misses_left == 0 {
                    true
                } else {
                    pending.misses_left -= 1;
                    false
                }
            }
            _ => false,
        };
        if !ready {
            return Ok(None);
        }

        inner.pending_fork = None;
        let repo = repository(owner, name);
        inner.repositories.insert(key, repo.clone());
        Ok(Some(repo))
    }

    async fn create_fork(&self, _owner: &str, repo: &str) -> Result<(), ApiError> {
        let mut inner = self.lock();
        inner.calls.push("create_fork".to_string());
        if let Some(err) = inner.create_fork_error.clone() {
            return Err(err);
        }
        inner.pending_fork = Some(PendingFork {
            owner: inner.login.clone(),
            name: repo.to_string(),
            misses_left: inner.fork_delay,
        });
        Ok(())
    }

    async fn create_pull_request(
        &self,
        owner: &str,
        repo: &str,
        request: NewPullRequest,
    ) -> Result<CreatedPullRequest, ApiError> {
        let mut inner = self.lock();
        inner.calls.push("create_pull_request".to_string());
        inner
            .created
            .push((owner.to_string(), repo.to_string(), request));
        let number = 7 + inner.created.len() as u64;
        Ok(CreatedPullRequest {
            number,
            html_url: format!("https://github.com/{}/{}/pull/{}", owner, repo, number),
        })
    }
}

/// One recorded git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    Clone { url: String, branch: String, dir: PathBuf },
    AddRemote { dir: PathBuf, name: String, url: String },
    Fetch { dir: PathBuf, remote: String },
    CreateBranch { dir: PathBuf, branch: String, start_point: String },
    Revert { dir: PathBuf, sha: String },
    Push { dir: PathBuf, remote: String, branch: String },
}

impl GitCall {
    fn name(&self) -> &'static str {
        match self {
            GitCall::Clone { .. } => "clone",
            GitCall::AddRemote { .. } => "remote",
            GitCall::Fetch { .. } => "fetch",
            GitCall::CreateBranch { .. } => "checkout",
            GitCall::Revert { .. } => "revert",
            GitCall::Push { .. } => "push",
        }
    }
}

/// Records git calls instead of running them.
#[derive(Debug, Default)]
pub struct FakeGit {
    calls: Mutex<Vec<GitCall>>,
    fail_on: Option<&'static str>,
    conflict: bool,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named subcommand (`clone`, `fetch`, `push`, ...) exit non-zero.
    pub fn failing_on(mut self, subcommand: &'static str) -> Self {
        self.fail_on = Some(subcommand);
        self
    }

    /// Make every revert hit a conflict.
    pub fn conflicting(mut self) -> Self {
        self.conflict = true;
        self
    }

    pub fn calls(&self) -> Vec<GitCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: GitCall) -> Result<(), GitError> {
        let name = call.name();
        let sha = match &call {
            GitCall::Revert { sha, .. } => Some(sha.clone()),
            _ => None,
        };
        self.calls.lock().unwrap().push(call);

        if let (true, Some(sha)) = (self.conflict, sha) {
            return Err(GitError::Conflict { sha });
        }
        if self.fail_on == Some(name) {
            return Err(GitError::Failed {
                command: name.to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Vcs for FakeGit {
    async fn clone_repo(&self, url: &str, branch: &str, dir: &Path) -> Result<(), GitError> {
        self.record(GitCall::Clone {
            url: url.to_string(),
            branch: branch.to_string(),
            dir: dir.to_path_buf(),
        })
    }

    async fn add_remote(&self, dir: &Path, name: &str, url: &str) -> Result<(), GitError> {
        self.record(GitCall::AddRemote {
            dir: dir.to_path_buf(),
            name: name.to_string(),
            url: url.to_string(),
        })
    }

    async fn fetch(&self, dir: &Path, remote: &str) -> Result<(), GitError> {
        self.record(GitCall::Fetch {
            dir: dir.to_path_buf(),
            remote: remote.to_string(),
        })
    }

    async fn create_branch(&self, dir: &Path, branch: &str, start_point: &str) -> Result<(), GitError> {
        self.record(GitCall::CreateBranch {
            dir: dir.to_path_buf(),
            branch: branch.to_string(),
            start_point: start_point.to_string(),
        })
    }

    async fn revert_commit(&self, dir: &Path, sha: &str) -> Result<(), GitError> {
        self.record(GitCall::Revert {
            dir: dir.to_path_buf(),
            sha: sha.to_string(),
        })
    }

    async fn push(&self, dir: &Path, remote: &str, branch: &str) -> Result<(), GitError> {
        self.record(GitCall::Push {
            dir: dir.to_path_buf(),
            remote: remote.to_string(),
            branch: branch.to_string(),
        })
    }
}
