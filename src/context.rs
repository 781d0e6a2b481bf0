//! Run context — configuration, frozen registry and the parsed changeset
//!
//! Built once per invocation and shared read-only by every repository run.

use gator_core::{slugify, Configuration, Result};
use gator_git::random_branch_name;
use gator_host::Metadata;
use gator_resources::{build_changeset, Changeset, ResourceRegistry};
use std::path::Path;
use std::sync::Arc;

pub const BRANCH_PREFIX: &str = "gator";

pub struct RunContext {
    config: Configuration,
    registry: ResourceRegistry,
    changeset: Arc<Changeset>,
    branch: String,
}

impl RunContext {
    pub fn new(config: Configuration, registry: ResourceRegistry, changeset: Changeset) -> Self {
        let branch = branch_name(changeset.name());
        Self {
            config,
            registry,
            changeset: Arc::new(changeset),
            branch,
        }
    }

    /// Parse the changeset at `path` with `registry`, then freeze both.
    pub fn load(config: Configuration, registry: ResourceRegistry, path: &Path) -> Result<Self> {
        let changeset = load_changeset(&registry, path)?;
        Ok(Self::new(config, registry, changeset))
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn changeset(&self) -> &Arc<Changeset> {
        &self.changeset
    }

    /// Branch the changes are pushed to. Stable across runs of the same changeset.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Title, body and labels for the issue or pull request.
    pub fn metadata(&self) -> Metadata {
        let changeset = &self.changeset;
        let body = match changeset.issue_body() {
            Some(body) => body.to_string(),
            None => format!("Automated changes from changeset '{}'.", changeset.name()),
        };
        Metadata::new(
            changeset.issue_title_or_name(),
            body,
            self.config.labels.clone(),
        )
    }

    pub fn commit_message(&self) -> String {
        format!("{}: {}", BRANCH_PREFIX, self.changeset.issue_title_or_name())
    }
}

pub fn load_changeset(registry: &ResourceRegistry, path: &Path) -> Result<Changeset> {
    let text = std::fs::read_to_string(path)?;
    build_changeset(registry, &text)
}

fn branch_name(changeset_name: &str) -> String {
    let slug = slugify(changeset_name);
    if slug.is_empty() {
        // Nothing usable in the name; the branch will differ between runs.
        format!("{}/{}", BRANCH_PREFIX, random_branch_name())
    } else {
        format!("{}/{}", BRANCH_PREFIX, slug)
    }
}
