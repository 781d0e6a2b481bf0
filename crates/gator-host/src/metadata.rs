//! Desired issue / pull request metadata and the update decision

use crate::host::{Issue, PullRequest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

impl Metadata {
    pub fn new(title: impl Into<String>, body: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            labels,
        }
    }
}

/// An existing issue or pull request.
pub trait HostItem {
    fn number(&self) -> u64;
    fn title(&self) -> &str;
    fn body(&self) -> &str;
    fn labels(&self) -> &[String];
}

impl HostItem for PullRequest {
    fn number(&self) -> u64 {
        self.number
    }
    fn title(&self) -> &str {
        &self.title
    }
    fn body(&self) -> &str {
        &self.body
    }
    fn labels(&self) -> &[String] {
        &self.labels
    }
}

impl HostItem for Issue {
    fn number(&self) -> u64 {
        self.number
    }
    fn title(&self) -> &str {
        &self.title
    }
    fn body(&self) -> &str {
        &self.body
    }
    fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Title and body equal, and every desired label already present.
///
/// Extra labels on the existing item are fine; people add their own.
pub fn metadata_matches(existing: &impl HostItem, desired: &Metadata) -> bool {
    if existing.title() != desired.title || existing.body() != desired.body {
        return false;
    }
    desired
        .labels
        .iter()
        .all(|label| existing.labels().contains(label))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertPlan {
    Create,
    Update(u64),
    Unchanged(u64),
}

pub fn plan_upsert<T: HostItem>(existing: Option<&T>, desired: &Metadata) -> UpsertPlan {
    match existing {
        None => UpsertPlan::Create,
        Some(item) if metadata_matches(item, desired) => UpsertPlan::Unchanged(item.number()),
        Some(item) => UpsertPlan::Update(item.number()),
    }
}
