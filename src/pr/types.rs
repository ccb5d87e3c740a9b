/// The parsed components of a GitHub PR URL.
/// Extracted by parse_pr_url() in pr/mod.rs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrUrl {
    pub owner: String,
    pub repo: String,
    pub pr_number: u64,
}

/// Metadata about a pull request that a revert is built from.
/// Constructed from a PrUrl plus one GitHub API lookup; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub owner: String,
    pub repo: String,
    /// PR number (e.g., 42)
    pub number: u64,
    /// PR title
    pub title: String,
    /// Author's GitHub login
    pub author: String,
    /// Commit that merged the PR; empty when the PR was never merged
    pub merge_commit_sha: String,
    /// Branch the PR was merged into
    pub base_branch: String,
    /// Clone URL of the repository the PR targets
    pub clone_url: String,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        !self.merge_commit_sha.is_empty()
    }

    /// `owner/repo`, used in log fields and messages.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}
