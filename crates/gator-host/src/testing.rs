//! In-memory code host
//!
//! Keeps pull requests and issues in process and records every call, so runs
//! can be exercised end to end against local git remotes.

use crate::host::{CodeHost, HostError, HostResult, Issue, PullRequest};
use crate::metadata::Metadata;
use gator_core::RepositoryName;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    FindPullRequest { repo: String, head: String },
    CreatePullRequest { repo: String, head: String, base: String },
    UpdatePullRequest { repo: String, number: u64 },
    FindIssue { repo: String, title: String },
    CreateIssue { repo: String },
    UpdateIssue { repo: String, number: u64 },
}

#[derive(Default)]
struct State {
    next_number: u64,
    pull_requests: BTreeMap<String, Vec<PullRequest>>,
    issues: BTreeMap<String, Vec<Issue>>,
    calls: Vec<HostCall>,
}

#[derive(Default)]
pub struct InMemoryHost {
    /// Clone URLs resolve to `<remote_root>/<owner>/<name>.git`.
    remote_root: Option<PathBuf>,
    state: Mutex<State>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote_root(root: impl Into<PathBuf>) -> Self {
        Self {
            remote_root: Some(root.into()),
            state: Mutex::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn pull_requests(&self, repo: &RepositoryName) -> Vec<PullRequest> {
        self.state()
            .pull_requests
            .get(&repo.full_name())
            .cloned()
            .unwrap_or_default()
    }

    pub fn issues(&self, repo: &RepositoryName) -> Vec<Issue> {
        self.state()
            .issues
            .get(&repo.full_name())
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state().calls.clone()
    }

    /// Seed an existing pull request, as if opened by an earlier run.
    pub fn insert_pull_request(&self, repo: &RepositoryName, pull: PullRequest) {
        let mut state = self.state();
        state.next_number = state.next_number.max(pull.number);
        state
            .pull_requests
            .entry(repo.full_name())
            .or_default()
            .push(pull);
    }

    fn url(repo: &RepositoryName, kind: &str, number: u64) -> String {
        format!("memory://{}/{}/{}", repo.full_name(), kind, number)
    }
}

fn merge_labels(existing: &mut Vec<String>, desired: &[String]) {
    for label in desired {
        if !existing.contains(label) {
            existing.push(label.clone());
        }
    }
}

#[async_trait::async_trait]
impl CodeHost for InMemoryHost {
    fn name(&self) -> &str {
        "memory"
    }

    fn clone_url(&self, repo: &RepositoryName) -> String {
        match &self.remote_root {
            Some(root) => root
                .join(&repo.owner)
                .join(format!("{}.git", repo.name))
                .display()
                .to_string(),
            None => format!("memory://{}", repo.full_name()),
        }
    }

    async fn find_pull_request(
        &self,
        repo: &RepositoryName,
        head: &str,
    ) -> HostResult<Option<PullRequest>> {
        let mut state = self.state();
        state.calls.push(HostCall::FindPullRequest {
            repo: repo.full_name(),
            head: head.to_string(),
        });
        Ok(state
            .pull_requests
            .get(&repo.full_name())
            .and_then(|pulls| pulls.iter().find(|p| p.head == head).cloned()))
    }

    async fn create_pull_request(
        &self,
        repo: &RepositoryName,
        head: &str,
        base: &str,
        metadata: &Metadata,
    ) -> HostResult<PullRequest> {
        let mut state = self.state();
        state.calls.push(HostCall::CreatePullRequest {
            repo: repo.full_name(),
            head: head.to_string(),
            base: base.to_string(),
        });
        state.next_number += 1;
        let number = state.next_number;
        let pull = PullRequest {
            number,
            title: metadata.title.clone(),
            body: metadata.body.clone(),
            labels: metadata.labels.clone(),
            head: head.to_string(),
            base: base.to_string(),
            url: Self::url(repo, "pull", number),
        };
        state
            .pull_requests
            .entry(repo.full_name())
            .or_default()
            .push(pull.clone());
        Ok(pull)
    }

    async fn update_pull_request(
        &self,
        repo: &RepositoryName,
        number: u64,
        metadata: &Metadata,
    ) -> HostResult<PullRequest> {
        let mut state = self.state();
        state.calls.push(HostCall::UpdatePullRequest {
            repo: repo.full_name(),
            number,
        });
        let pull = state
            .pull_requests
            .get_mut(&repo.full_name())
            .and_then(|pulls| pulls.iter_mut().find(|p| p.number == number))
            .ok_or_else(|| HostError::NotFound(format!("pull request #{} in {}", number, repo)))?;
        pull.title = metadata.title.clone();
        pull.body = metadata.body.clone();
        merge_labels(&mut pull.labels, &metadata.labels);
        Ok(pull.clone())
    }

    async fn find_issue(&self, repo: &RepositoryName, title: &str) -> HostResult<Option<Issue>> {
        let mut state = self.state();
        state.calls.push(HostCall::FindIssue {
            repo: repo.full_name(),
            title: title.to_string(),
        });
        Ok(state
            .issues
            .get(&repo.full_name())
            .and_then(|issues| issues.iter().find(|i| i.title == title).cloned()))
    }

    async fn create_issue(&self, repo: &RepositoryName, metadata: &Metadata) -> HostResult<Issue> {
        let mut state = self.state();
        state.calls.push(HostCall::CreateIssue {
            repo: repo.full_name(),
        });
        state.next_number += 1;
        let number = state.next_number;
        let issue = Issue {
            number,
            title: metadata.title.clone(),
            body: metadata.body.clone(),
            labels: metadata.labels.clone(),
            url: Self::url(repo, "issues", number),
        };
        state
            .issues
            .entry(repo.full_name())
            .or_default()
            .push(issue.clone());
        Ok(issue)
    }

    async fn update_issue(
        &self,
        repo: &RepositoryName,
        number: u64,
        metadata: &Metadata,
    ) -> HostResult<Issue> {
        let mut state = self.state();
        state.calls.push(HostCall::UpdateIssue {
            repo: repo.full_name(),
            number,
        });
        let issue = state
            .issues
            .get_mut(&repo.full_name())
            .and_then(|issues| issues.iter_mut().find(|i| i.number == number))
            .ok_or_else(|| HostError::NotFound(format!("issue #{} in {}", number, repo)))?;
        issue.title = metadata.title.clone();
        issue.body = metadata.body.clone();
        merge_labels(&mut issue.labels, &metadata.labels);
        Ok(issue.clone())
    }
}
