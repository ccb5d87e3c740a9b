use colored::Colorize;
use std::collections::HashSet;

use crate::github::CreatedPullRequest;
use crate::pr::PullRequest;

/// Render the description of a revert PR.
///
/// The template is fixed at compile time, so rendering cannot fail.
pub fn render_body(pr: &PullRequest, jira: &str, context: &str, jobs: &str) -> String {
    format!(
        r#"
Reverts #{original_pr} ; tracked by {jira}

Per [OpenShift policy](https://github.com/openshift/enhancements/blob/master/enhancements/release/improving-ci-signal.md#quick-revert), we are reverting this breaking change to get CI and/or nightly payloads flowing again.

{context}

To unrevert this, revert this PR, and layer an additional separate commit on top that addresses the problem. Before merging the unrevert, please run these jobs on the PR and check the result of these jobs to confirm the fix has corrected the problem:

```
{jobs}
```

CC: @{author}

<div align="right">
PR created by Revertomatic<sup>:tm:</sup>
</div>
"#,
        original_pr = pr.number,
        jira = jira,
        context = context,
        jobs = jobs.trim_end(),
        author = pr.author,
    )
}

/// Title of a revert PR, e.g. `JIRA-1: Revert #42 "Add OAuth2 login flow"`.
pub fn revert_title(pr: &PullRequest, jira: &str) -> String {
    format!("{}: Revert #{} {:?}", jira, pr.number, pr.title)
}

/// One `/override <context>` comment line per context, sorted for stable output.
pub fn override_lines(statuses: &HashSet<String>) -> Vec<String> {
    let mut contexts: Vec<_> = statuses.iter().collect();
    contexts.sort();
    contexts
        .into_iter()
        .map(|context| format!("/override {}", context))
        .collect()
}

/// Print the override comment block to stdout.
pub fn print_overrides(statuses: &HashSet<String>) {
    println!(
        "{}",
        "******** You can use the comment below to override CI:".bold()
    );
    if statuses.is_empty() {
        println!("  No overridable contexts.");
    }
    for line in override_lines(statuses) {
        println!("{}", line);
    }
}

pub fn print_created(created: &CreatedPullRequest, branch: &str) {
    println!();
    println!(
        "{} #{} {}",
        "Revert PR opened:".green().bold(),
        created.number,
        created.html_url
    );
    println!("Branch: {}", branch);
    println!();
}
