//! Resource model — the Filter and CodeChange capabilities
//!
//! A `GatorResource` pairs the validated document (`kind`, `version`, `spec`)
//! with the behaviour built from it. Equality is structural over the
//! document; the behaviour is derived from it and never compared.

use gator_core::{Capability, ResourceDescriptor, Result};
use std::fmt;
use std::path::Path;

/// Decides whether a repository is eligible for further processing.
pub trait Filter: Send + Sync + fmt::Debug {
    /// `root` is the working-tree root of the repository under evaluation.
    fn matches(&self, root: &Path) -> Result<bool>;
}

/// Mutates a repository working tree.
///
/// Implementations must tolerate a tree that already reflects the change:
/// applying twice must leave the same content as applying once.
pub trait CodeChange: Send + Sync + fmt::Debug {
    fn apply_change(&self, root: &Path) -> Result<()>;
}

pub enum Behavior {
    Filter(Box<dyn Filter>),
    CodeChange(Box<dyn CodeChange>),
}

impl Behavior {
    pub fn filter(filter: impl Filter + 'static) -> Self {
        Self::Filter(Box::new(filter))
    }

    pub fn code_change(change: impl CodeChange + 'static) -> Self {
        Self::CodeChange(Box::new(change))
    }

    pub fn capability(&self) -> Capability {
        match self {
            Self::Filter(_) => Capability::Filter,
            Self::CodeChange(_) => Capability::CodeChange,
        }
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter(inner) => f.debug_tuple("Filter").field(inner).finish(),
            Self::CodeChange(inner) => f.debug_tuple("CodeChange").field(inner).finish(),
        }
    }
}

pub struct GatorResource {
    descriptor: ResourceDescriptor,
    spec: serde_yaml::Value,
    behavior: Behavior,
}

impl GatorResource {
    pub fn new(descriptor: ResourceDescriptor, spec: serde_yaml::Value, behavior: Behavior) -> Self {
        Self {
            descriptor,
            spec,
            behavior,
        }
    }

    pub fn kind(&self) -> &str {
        &self.descriptor.kind
    }

    pub fn version(&self) -> &str {
        &self.descriptor.version
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    /// The validated `spec` node exactly as it appeared in the document.
    pub fn spec(&self) -> &serde_yaml::Value {
        &self.spec
    }

    pub fn capability(&self) -> Capability {
        self.behavior.capability()
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn as_filter(&self) -> Option<&dyn Filter> {
        match &self.behavior {
            Behavior::Filter(f) => Some(f.as_ref()),
            Behavior::CodeChange(_) => None,
        }
    }

    pub fn as_code_change(&self) -> Option<&dyn CodeChange> {
        match &self.behavior {
            Behavior::CodeChange(c) => Some(c.as_ref()),
            Behavior::Filter(_) => None,
        }
    }
}

impl PartialEq for GatorResource {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor
            && self.spec == other.spec
            && self.capability() == other.capability()
    }
}

impl fmt::Debug for GatorResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatorResource")
            .field("kind", &self.descriptor.kind)
            .field("version", &self.descriptor.version)
            .field("spec", &self.spec)
            .field("behavior", &self.behavior)
            .finish()
    }
}
