//! GitHub REST v3 code host (github.com and GitHub Enterprise)

use crate::host::{CodeHost, HostError, HostResult, Issue, PullRequest};
use crate::metadata::Metadata;
use gator_core::RepositoryName;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const GITHUB_DOMAIN: &str = "github.com";
const GITHUB_API_URL: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("gator/", env!("CARGO_PKG_VERSION"));

pub struct GitHubHost {
    client: Client,
    domain: String,
    username: String,
    token: String,
    base_url: String,
}

impl GitHubHost {
    pub fn new(
        domain: impl Into<String>,
        username: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let domain = domain.into();
        let base_url = if domain == GITHUB_DOMAIN {
            GITHUB_API_URL.to_string()
        } else {
            format!("https://{}/api/v3", domain)
        };
        Self {
            client: Client::new(),
            domain,
            username: username.into(),
            token: token.into(),
            base_url,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header("accept", "application/vnd.github+json")
            .header("x-github-api-version", GITHUB_API_VERSION)
            .header("user-agent", USER_AGENT)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> HostResult<T> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("GitHub error {}: {}", status, error_text);
            return Err(match status.as_u16() {
                401 | 403 => HostError::AuthFailed(error_text),
                404 => HostError::NotFound(error_text),
                429 => HostError::RateLimited(error_text),
                _ => HostError::RequestFailed(format!("{}: {}", status, error_text)),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| HostError::InvalidResponse(e.to_string()))
    }

    /// Add labels to an issue or pull request. Existing labels are kept.
    async fn add_labels(
        &self,
        repo: &RepositoryName,
        number: u64,
        labels: &[String],
    ) -> HostResult<Vec<String>> {
        if labels.is_empty() {
            let current: Vec<GhLabel> = self
                .send(self.request(Method::GET, &issue_path(repo, Some(number), "/labels")))
                .await?;
            return Ok(current.into_iter().map(|l| l.name).collect());
        }
        let added: Vec<GhLabel> = self
            .send(
                self.request(Method::POST, &issue_path(repo, Some(number), "/labels"))
                    .json(&LabelsBody { labels }),
            )
            .await?;
        Ok(added.into_iter().map(|l| l.name).collect())
    }
}

fn repo_path(repo: &RepositoryName) -> String {
    format!("/repos/{}/{}", repo.owner, repo.name)
}

fn issue_path(repo: &RepositoryName, number: Option<u64>, suffix: &str) -> String {
    match number {
        Some(n) => format!("{}/issues/{}{}", repo_path(repo), n, suffix),
        None => format!("{}/issues{}", repo_path(repo), suffix),
    }
}

#[derive(Serialize)]
struct LabelsBody<'a> {
    labels: &'a [String],
}

#[derive(Serialize)]
struct CreatePullBody<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

#[derive(Serialize)]
struct EditBody<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
struct CreateIssueBody<'a> {
    title: &'a str,
    body: &'a str,
    labels: &'a [String],
}

#[derive(Debug, Deserialize)]
struct GhLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhRef {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct GhPull {
    number: u64,
    title: String,
    body: Option<String>,
    #[serde(default)]
    labels: Vec<GhLabel>,
    head: GhRef,
    base: GhRef,
    html_url: String,
}

impl From<GhPull> for PullRequest {
    fn from(pull: GhPull) -> Self {
        Self {
            number: pull.number,
            title: pull.title,
            body: pull.body.unwrap_or_default(),
            labels: pull.labels.into_iter().map(|l| l.name).collect(),
            head: pull.head.name,
            base: pull.base.name,
            url: pull.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GhIssue {
    number: u64,
    title: String,
    body: Option<String>,
    #[serde(default)]
    labels: Vec<GhLabel>,
    html_url: String,
    /// Present when the issue is really a pull request.
    pull_request: Option<serde_json::Value>,
}

impl From<GhIssue> for Issue {
    fn from(issue: GhIssue) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            body: issue.body.unwrap_or_default(),
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
            url: issue.html_url,
        }
    }
}

#[async_trait::async_trait]
impl CodeHost for GitHubHost {
    fn name(&self) -> &str {
        "github"
    }

    fn clone_url(&self, repo: &RepositoryName) -> String {
        format!(
            "https://{}:{}@{}/{}/{}.git",
            self.username, self.token, self.domain, repo.owner, repo.name
        )
    }

    async fn find_pull_request(
        &self,
        repo: &RepositoryName,
        head: &str,
    ) -> HostResult<Option<PullRequest>> {
        let qualified_head = format!("{}:{}", repo.owner, head);
        let pulls: Vec<GhPull> = self
            .send(
                self.request(Method::GET, &format!("{}/pulls", repo_path(repo)))
                    .query(&[("state", "open"), ("head", qualified_head.as_str())]),
            )
            .await?;
        debug!("{} open pull request(s) for {} on {}", pulls.len(), head, repo);
        Ok(pulls
            .into_iter()
            .find(|p| p.head.name == head)
            .map(PullRequest::from))
    }

    async fn create_pull_request(
        &self,
        repo: &RepositoryName,
        head: &str,
        base: &str,
        metadata: &Metadata,
    ) -> HostResult<PullRequest> {
        let pull: GhPull = self
            .send(
                self.request(Method::POST, &format!("{}/pulls", repo_path(repo)))
                    .json(&CreatePullBody {
                        title: &metadata.title,
                        body: &metadata.body,
                        head,
                        base,
                    }),
            )
            .await?;
        let mut pull = PullRequest::from(pull);
        pull.labels = self.add_labels(repo, pull.number, &metadata.labels).await?;
        Ok(pull)
    }

    async fn update_pull_request(
        &self,
        repo: &RepositoryName,
        number: u64,
        metadata: &Metadata,
    ) -> HostResult<PullRequest> {
        let pull: GhPull = self
            .send(
                self.request(Method::PATCH, &format!("{}/pulls/{}", repo_path(repo), number))
                    .json(&EditBody {
                        title: &metadata.title,
                        body: &metadata.body,
                    }),
            )
            .await?;
        let mut pull = PullRequest::from(pull);
        pull.labels = self.add_labels(repo, number, &metadata.labels).await?;
        Ok(pull)
    }

    async fn find_issue(&self, repo: &RepositoryName, title: &str) -> HostResult<Option<Issue>> {
        let issues: Vec<GhIssue> = self
            .send(
                self.request(Method::GET, &issue_path(repo, None, ""))
                    .query(&[
                        ("state", "open"),
                        ("creator", self.username.as_str()),
                        ("per_page", "100"),
                    ]),
            )
            .await?;
        Ok(issues
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .find(|i| i.title == title)
            .map(Issue::from))
    }

    async fn create_issue(&self, repo: &RepositoryName, metadata: &Metadata) -> HostResult<Issue> {
        let issue: GhIssue = self
            .send(
                self.request(Method::POST, &issue_path(repo, None, ""))
                    .json(&CreateIssueBody {
                        title: &metadata.title,
                        body: &metadata.body,
                        labels: &metadata.labels,
                    }),
            )
            .await?;
        Ok(issue.into())
    }

    async fn update_issue(
        &self,
        repo: &RepositoryName,
        number: u64,
        metadata: &Metadata,
    ) -> HostResult<Issue> {
        let issue: GhIssue = self
            .send(
                self.request(Method::PATCH, &issue_path(repo, Some(number), ""))
                    .json(&EditBody {
                        title: &metadata.title,
                        body: &metadata.body,
                    }),
            )
            .await?;
        let mut issue = Issue::from(issue);
        issue.labels = self.add_labels(repo, number, &metadata.labels).await?;
        Ok(issue)
    }
}
