//! Shared types and constants used across the Gator crates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The only resource version currently understood.
pub const VERSION_V1ALPHA: &str = "v1alpha";

/// `kind` of the top-level changeset document.
pub const CHANGESET_KIND: &str = "Changeset";

/// Version-control metadata directory never read by filters or changes.
pub const GIT_INTERNALS_DIRECTORY: &str = ".git";

/// Label applied to every issue and pull request Gator opens.
pub const DEFAULT_AUTOMATION_LABEL: &str = "gator";

/// Which behaviour a resource kind provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Filter,
    CodeChange,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter => write!(f, "filter"),
            Self::CodeChange => write!(f, "code change"),
        }
    }
}

/// Identifies a resource type: the registry key plus its schema version.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceDescriptor {
    pub kind: String,
    pub version: String,
}

impl ResourceDescriptor {
    pub fn new(kind: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.version)
    }
}

/// Git author identity used for automated commits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

/// A hosted repository in `owner/name` form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryName {
    pub owner: String,
    pub name: String,
}

impl RepositoryName {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryName {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner.trim(), name.trim()))
            }
            _ => Err(crate::Error::Configuration(format!(
                "repository must be in 'owner/name' form, got '{}'",
                s
            ))),
        }
    }
}

/// Lowercase, dash-separated form of a changeset name, safe for branch names.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
