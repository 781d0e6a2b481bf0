//! Gator Host — pull requests and issues on the code host
//!
//! `CodeHost` is the seam; `GitHubHost` talks to the GitHub REST API and
//! `InMemoryHost` records everything for tests and dry runs.

pub mod github;
pub mod host;
pub mod metadata;
pub mod testing;

pub use github::GitHubHost;
pub use host::{CodeHost, HostError, HostResult, Issue, PullRequest};
pub use metadata::{metadata_matches, plan_upsert, HostItem, Metadata, UpsertPlan};
pub use testing::{HostCall, InMemoryHost};
