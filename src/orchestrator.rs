//! Orchestrator — runs a changeset against each configured repository
//!
//! Per repository: clone or update, filter, then either upsert an issue (no
//! code changes) or apply the changes on a feature branch, push when the
//! result differs from what is already on the remote, and upsert the pull
//! request. Git and filesystem work is blocking and runs on the blocking
//! pool; code-host calls are async. Repositories run one at a time and a
//! failure in one is recorded without stopping the rest.

use crate::context::RunContext;
use gator_core::RepositoryName;
use gator_git::{
    compute_diff, has_human_commits, is_current_branch_stale, local_matches_remote,
    reset_to_default_branch, with_feature_branch, VcsProvider,
};
use gator_host::{plan_upsert, CodeHost, UpsertPlan};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to an issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    Created(u64),
    Updated(u64),
    Unchanged(u64),
}

impl HostAction {
    pub fn number(&self) -> u64 {
        match self {
            Self::Created(n) | Self::Updated(n) | Self::Unchanged(n) => *n,
        }
    }
}

impl fmt::Display for HostAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created(n) => write!(f, "created #{}", n),
            Self::Updated(n) => write!(f, "updated #{}", n),
            Self::Unchanged(n) => write!(f, "#{} unchanged", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A filter did not match.
    FilteredOut,
    /// The code changes left the tree untouched.
    NoChanges,
    /// Nothing was pushed or opened. `diff` is empty for issue-only changesets.
    DryRun { diff: String },
    /// Someone other than the automation committed to the branch last.
    HumanOverride,
    Issue(HostAction),
    /// The remote branch already holds these changes.
    UpToDate(HostAction),
    Pushed { commit: String, pull_request: HostAction },
    Failed { error: String },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FilteredOut => write!(f, "filtered out"),
            Self::NoChanges => write!(f, "no changes"),
            Self::DryRun { diff } if diff.is_empty() => write!(f, "dry run"),
            Self::DryRun { diff } => write!(f, "dry run ({} diff lines)", diff.lines().count()),
            Self::HumanOverride => write!(f, "skipped, branch has human commits"),
            Self::Issue(action) => write!(f, "issue {}", action),
            Self::UpToDate(action) => write!(f, "up to date, pull request {}", action),
            Self::Pushed {
                commit,
                pull_request,
            } => write!(
                f,
                "pushed {}, pull request {}",
                &commit[..commit.len().min(12)],
                pull_request
            ),
            Self::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    results: Vec<(RepositoryName, Outcome)>,
}

impl RunReport {
    pub fn results(&self) -> &[(RepositoryName, Outcome)] {
        &self.results
    }

    pub fn outcome(&self, repo: &RepositoryName) -> Option<&Outcome> {
        self.results
            .iter()
            .find(|(name, _)| name == repo)
            .map(|(_, outcome)| outcome)
    }

    pub fn failures(&self) -> usize {
        self.results.iter().filter(|(_, o)| o.is_failure()).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} repositories, {} failed",
            self.results.len(),
            self.failures()
        )?;
        for (repo, outcome) in &self.results {
            writeln!(f, "  {}: {}", repo, outcome)?;
        }
        Ok(())
    }
}

/// Result of the blocking phase; host calls happen afterwards.
enum Prepared {
    Done(Outcome),
    OpenIssue,
    PullRequest { commit: Option<String>, base: String },
}

pub struct Orchestrator {
    context: Arc<RunContext>,
    vcs: Arc<dyn VcsProvider>,
    host: Arc<dyn CodeHost>,
}

impl Orchestrator {
    pub fn new(context: RunContext, vcs: Arc<dyn VcsProvider>, host: Arc<dyn CodeHost>) -> Self {
        Self {
            context: Arc::new(context),
            vcs,
            host,
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub async fn run(&self, repos: &[RepositoryName]) -> RunReport {
        let mut report = RunReport::default();
        for repo in repos {
            let outcome = self.run_repository(repo).await;
            if outcome.is_failure() {
                warn!("{}: {}", repo, outcome);
            } else {
                info!("{}: {}", repo, outcome);
            }
            report.results.push((repo.clone(), outcome));
        }
        report
    }

    pub async fn run_repository(&self, repo: &RepositoryName) -> Outcome {
        match self.process(repo).await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failed {
                error: format!("{:#}", e),
            },
        }
    }

    async fn process(&self, repo: &RepositoryName) -> anyhow::Result<Outcome> {
        let url = self.host.clone_url(repo);
        let context = self.context.clone();
        let vcs = self.vcs.clone();
        let target = repo.clone();
        let prepared =
            tokio::task::spawn_blocking(move || prepare(&context, vcs.as_ref(), &url, &target))
                .await??;

        match prepared {
            Prepared::Done(outcome) => Ok(outcome),
            Prepared::OpenIssue => Ok(Outcome::Issue(self.upsert_issue(repo).await?)),
            Prepared::PullRequest { commit, base } => {
                let action = self.upsert_pull_request(repo, &base).await?;
                Ok(match commit {
                    Some(commit) => Outcome::Pushed {
                        commit,
                        pull_request: action,
                    },
                    None => Outcome::UpToDate(action),
                })
            }
        }
    }

    async fn upsert_issue(&self, repo: &RepositoryName) -> anyhow::Result<HostAction> {
        let metadata = self.context.metadata();
        let existing = self.host.find_issue(repo, &metadata.title).await?;
        let action = match plan_upsert(existing.as_ref(), &metadata) {
            UpsertPlan::Create => HostAction::Created(self.host.create_issue(repo, &metadata).await?.number),
            UpsertPlan::Update(number) => {
                self.host.update_issue(repo, number, &metadata).await?;
                HostAction::Updated(number)
            }
            UpsertPlan::Unchanged(number) => HostAction::Unchanged(number),
        };
        debug!("Issue on {}: {}", repo, action);
        Ok(action)
    }

    async fn upsert_pull_request(
        &self,
        repo: &RepositoryName,
        base: &str,
    ) -> anyhow::Result<HostAction> {
        let metadata = self.context.metadata();
        let head = self.context.branch();
        let existing = self.host.find_pull_request(repo, head).await?;
        let action = match plan_upsert(existing.as_ref(), &metadata) {
            UpsertPlan::Create => HostAction::Created(
                self.host
                    .create_pull_request(repo, head, base, &metadata)
                    .await?
                    .number,
            ),
            UpsertPlan::Update(number) => {
                self.host.update_pull_request(repo, number, &metadata).await?;
                HostAction::Updated(number)
            }
            UpsertPlan::Unchanged(number) => HostAction::Unchanged(number),
        };
        debug!("Pull request on {}: {}", repo, action);
        Ok(action)
    }
}

fn prepare(
    context: &RunContext,
    vcs: &dyn VcsProvider,
    url: &str,
    repo: &RepositoryName,
) -> gator_core::Result<Prepared> {
    let config = context.config();
    let changeset = context.changeset();

    let wc = vcs.clone_or_update(url, &config.clone_path(repo))?;
    reset_to_default_branch(&wc)?;

    for filter in changeset.filters() {
        if !filter.matches(wc.path())? {
            debug!("{} did not pass {:?}", repo, filter);
            return Ok(Prepared::Done(Outcome::FilteredOut));
        }
    }

    if !changeset.has_code_changes() {
        if config.dry_run {
            return Ok(Prepared::Done(Outcome::DryRun {
                diff: String::new(),
            }));
        }
        return Ok(Prepared::OpenIssue);
    }

    let base = wc.default_branch()?;
    let branch = context.branch();
    let identity = config.automation_identity();

    with_feature_branch(&wc, branch, |wc| {
        for change in changeset.code_changes() {
            change.apply_change(wc.path())?;
        }

        let diff = compute_diff(wc)?;
        if diff.is_empty() {
            return Ok(Prepared::Done(Outcome::NoChanges));
        }
        if config.dry_run {
            info!("Dry run diff for {}:\n{}", repo, diff);
            return Ok(Prepared::Done(Outcome::DryRun { diff }));
        }
        if has_human_commits(wc, branch, &identity)? {
            return Ok(Prepared::Done(Outcome::HumanOverride));
        }
        if !is_current_branch_stale(wc)? && local_matches_remote(wc)? {
            return Ok(Prepared::PullRequest { commit: None, base });
        }

        let commit = wc.commit_all(&identity, &context.commit_message())?;
        wc.force_push(branch)?;
        info!("Pushed {} to {} on {}", commit, branch, repo);
        Ok(Prepared::PullRequest {
            commit: Some(commit),
            base,
        })
    })
}
