//! Code host trait and the items it manages

use crate::metadata::Metadata;
use gator_core::RepositoryName;
use serde::{Deserialize, Serialize};

pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl From<HostError> for gator_core::Error {
    fn from(err: HostError) -> Self {
        gator_core::Error::CodeHost(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    /// Branch the changes live on.
    pub head: String,
    /// Branch the changes merge into.
    pub base: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub url: String,
}

/// Pull request and issue operations on a hosted repository.
///
/// Lookups only consider open items. Updates never remove labels.
#[async_trait::async_trait]
pub trait CodeHost: Send + Sync {
    fn name(&self) -> &str;

    /// Authenticated URL the VCS provider clones from.
    fn clone_url(&self, repo: &RepositoryName) -> String;

    /// The open pull request whose head is `head`, if any.
    async fn find_pull_request(
        &self,
        repo: &RepositoryName,
        head: &str,
    ) -> HostResult<Option<PullRequest>>;

    async fn create_pull_request(
        &self,
        repo: &RepositoryName,
        head: &str,
        base: &str,
        metadata: &Metadata,
    ) -> HostResult<PullRequest>;

    async fn update_pull_request(
        &self,
        repo: &RepositoryName,
        number: u64,
        metadata: &Metadata,
    ) -> HostResult<PullRequest>;

    /// The open issue with exactly this title, if any.
    async fn find_issue(&self, repo: &RepositoryName, title: &str) -> HostResult<Option<Issue>>;

    async fn create_issue(&self, repo: &RepositoryName, metadata: &Metadata) -> HostResult<Issue>;

    async fn update_issue(
        &self,
        repo: &RepositoryName,
        number: u64,
        metadata: &Metadata,
    ) -> HostResult<Issue>;
}
