use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::github::{ApiError, GitHubApi};
use crate::pr::PullRequest;

/// Jobs we typically don't want to override: fast-running, and the bare
/// minimum to make sure things build.
pub const DEFAULT_UNOVERRIDABLE_SUFFIXES: &[&str] =
    &["unit", "lint", "images", "verify", "tide", "verify-deps"];

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Failed to look up statuses: {0}")]
    Lookup(#[from] ApiError),

    #[error("GitHub did not report a head SHA for PR #{0}")]
    MissingHeadSha(u64),
}

/// Splits CI status contexts into overridable and reserved ones.
#[derive(Debug, Clone)]
pub struct StatusFilter {
    unoverridable: Option<Regex>,
}

impl StatusFilter {
    /// Build a filter that rejects contexts ending in any of `suffixes`
    /// (case-sensitive). An empty list rejects nothing.
    pub fn new<S: AsRef<str>>(suffixes: &[S]) -> Result<Self, regex::Error> {
        let alternatives: Vec<_> = suffixes
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| !s.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Ok(Self { unoverridable: None });
        }

        let pattern = format!("^.*({})$", alternatives.join("|"));
        Ok(Self {
            unoverridable: Some(Regex::new(&pattern)?),
        })
    }

    pub fn is_overridable(&self, context: &str) -> bool {
        !matches!(&self.unoverridable, Some(re) if re.is_match(context))
    }

    /// Distinct overridable contexts out of `contexts`.
    pub fn overridable<I, S>(&self, contexts: I) -> HashSet<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        contexts
            .into_iter()
            .map(Into::into)
            .filter(|c| self.is_overridable(c))
            .collect()
    }
}

impl Default for StatusFilter {
    fn default() -> Self {
        match Self::new(DEFAULT_UNOVERRIDABLE_SUFFIXES) {
            Ok(filter) => filter,
            Err(e) => unreachable!("built-in suffix pattern failed to compile: {e}"),
        }
    }
}

/// Statuses on the PR's current head commit that can be overridden.
///
/// The head is fetched fresh rather than taken from `pr`, since pushes after
/// the metadata snapshot move where CI reports.
#[instrument(skip_all, fields(pr = pr.number, repo = %pr.full_name()))]
pub async fn overridable_statuses(
    api: &dyn GitHubApi,
    filter: &StatusFilter,
    pr: &PullRequest,
) -> Result<HashSet<String>, StatusError> {
    let current = api.get_pull_request(&pr.owner, &pr.repo, pr.number).await?;
    let sha = current
        .head_sha
        .filter(|sha| !sha.is_empty())
        .ok_or(StatusError::MissingHeadSha(pr.number))?;
    info!(sha = %sha, head_of = current.number, "most recent SHA of the PR");

    let contexts = api
        .list_status_contexts(&pr.owner, &pr.repo, &sha)
        .await
        .map_err(|e| {
            warn!(sha = %sha, error = %e, "failed to get statuses");
            e
        })?;

    Ok(filter.overridable(contexts))
}
