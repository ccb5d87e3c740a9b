mod config;
mod fork;
mod git;
mod github;
mod pr;
mod report;
mod retry;
mod revert;
mod status;
#[cfg(test)]
mod testing;
mod workspace;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, info_span};
use tracing_subscriber::EnvFilter;

use crate::git::GitCli;
use crate::github::GitHubClient;
use crate::revert::{RevertRequest, Reverter};
use crate::status::StatusFilter;
use crate::workspace::WorkingCopyHandle;

/// Revertomatic — revert a merged GitHub Pull Request, open the revert PR with
/// a standard explanation, and list the CI contexts that can be overridden.
#[derive(Parser, Debug)]
#[command(name = "revertomatic", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Revert a merged PR and open a PR with the revert
    Revert(RevertArgs),

    /// Show the /override comments for a PR's CI contexts
    Override {
        /// Pull request URL (e.g., https://github.com/org/repo/pull/42)
        #[arg(short = 'p', long)]
        pr_url: String,
    },
}

#[derive(Args, Debug)]
struct RevertArgs {
    /// Pull request URL (e.g., https://github.com/org/repo/pull/42)
    #[arg(short = 'p', long)]
    pr_url: String,

    /// Tracking ticket for the revert (e.g., OCPBUGS-1234)
    #[arg(short = 'j', long)]
    jira: String,

    /// Why the PR is being reverted
    #[arg(short = 'c', long)]
    context: String,

    /// Jobs that must pass before the change is un-reverted, one per line
    #[arg(long)]
    jobs: String,

    /// Existing local clone to use instead of cloning into a temporary directory
    #[arg(long)]
    repo: Option<PathBuf>,

    /// Remote in --repo pointing at the upstream repository
    #[arg(long, default_value = "origin", requires = "repo")]
    upstream_remote: String,

    /// Remote in --repo pointing at your fork
    #[arg(long, default_value = "fork", requires = "repo")]
    fork_remote: String,
}

impl RevertArgs {
    fn into_request(self) -> RevertRequest {
        let working_copy = self.repo.map(|local_path| WorkingCopyHandle {
            local_path,
            upstream_remote: self.upstream_remote,
            fork_remote: self.fork_remote,
        });
        RevertRequest {
            pr_url: self.pr_url,
            jira: self.jira,
            context: self.context,
            jobs: self.jobs,
            working_copy,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load()?;
    let token = config.github_token()?;
    let status_filter = StatusFilter::new(&config.statuses.unoverridable_suffixes)
        .map_err(config::ConfigError::from)?;

    let fork_policy = config.fork.retry_policy()?;

    let api = GitHubClient::new(token, config.api_base())?;
    let git = GitCli::default();
    let reverter = Reverter::new(&api, &git)
        .with_fork_policy(fork_policy)
        .with_status_filter(status_filter);

    match cli.command {
        Command::Revert(args) => {
            let _main_span = info_span!("revertomatic_revert", pr_url = %args.pr_url).entered();
            let outcome = reverter.run(args.into_request()).await?;
            info!(reverted = outcome.reverted.number, created = outcome.created.number, "done");
            report::print_created(&outcome.created, &outcome.branch);
            report::print_overrides(&outcome.overridable);
        }
        Command::Override { pr_url } => {
            let _main_span = info_span!("revertomatic_override", pr_url = %pr_url).entered();
            let statuses = reverter.overrides(&pr_url).await?;
            report::print_overrides(&statuses);
        }
    }

    Ok(())
}
