//! Resource registry — maps a `kind` to the type that builds it
//!
//! The registry is plain owned state: build one, register kinds, then hand it
//! to the parser by reference. Nothing here is global.

use crate::model::Behavior;
use gator_core::{Capability, Error, ResourceDescriptor, Result};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// A resource type the registry can build from an untyped `spec` node.
pub trait ResourceType: Send + Sync {
    fn descriptor(&self) -> ResourceDescriptor;

    /// Exactly one capability is accepted at registration.
    fn capabilities(&self) -> &[Capability];

    /// Validate `spec` and build the behaviour it describes.
    fn build(&self, spec: serde_yaml::Value) -> Result<Behavior>;
}

/// Typed shortcut for the common case: a serde spec struct that turns into
/// a `Filter` or `CodeChange`.
pub trait ResourceSpec: DeserializeOwned + Send + Sync + 'static {
    const KIND: &'static str;
    const VERSION: &'static str;
    const CAPABILITY: Capability;

    fn into_behavior(self) -> Result<Behavior>;
}

/// Adapter exposing a [`ResourceSpec`] as a [`ResourceType`].
pub struct SpecResource<S>(PhantomData<fn() -> S>);

impl<S> SpecResource<S> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S> Default for SpecResource<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ResourceSpec> ResourceType for SpecResource<S> {
    fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor::new(S::KIND, S::VERSION)
    }

    fn capabilities(&self) -> &[Capability] {
        match S::CAPABILITY {
            Capability::Filter => &[Capability::Filter],
            Capability::CodeChange => &[Capability::CodeChange],
        }
    }

    fn build(&self, spec: serde_yaml::Value) -> Result<Behavior> {
        let typed: S = serde_yaml::from_value(spec).map_err(|e| {
            Error::invalid_specification_from(
                format!(
                    "Could not parse resource spec into the corresponding model for kind '{}'",
                    S::KIND
                ),
                e,
            )
        })?;
        let behavior = typed.into_behavior()?;
        if behavior.capability() != S::CAPABILITY {
            return Err(Error::invalid_specification(format!(
                "{} declares {} but built a {}",
                S::KIND,
                S::CAPABILITY,
                behavior.capability()
            )));
        }
        Ok(behavior)
    }
}

/// Registry of resource kinds, keyed by `kind`.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    types: HashMap<String, Arc<dyn ResourceType>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with every built-in kind.
    pub fn with_builtins() -> Self {
        crate::create_default_registry()
    }

    /// Register a resource type. Replaces any type with the same kind.
    ///
    /// On error the registry is left untouched.
    pub fn register(&mut self, resource: impl ResourceType + 'static) -> Result<()> {
        let descriptor = resource.descriptor();
        if descriptor.kind.trim().is_empty() {
            return Err(Error::invalid_resource(
                "Custom resource must declare a non-empty 'kind'",
            ));
        }
        if descriptor.version.trim().is_empty() {
            return Err(Error::invalid_resource(format!(
                "Custom resource '{}' must declare a non-empty 'version'",
                descriptor.kind
            )));
        }
        match resource.capabilities() {
            [_] => {}
            [] => {
                return Err(Error::invalid_resource(format!(
                    "Custom resource '{}' must implement either the filter or the code change capability",
                    descriptor.kind
                )))
            }
            many => {
                let names: Vec<String> = many.iter().map(|c| c.to_string()).collect();
                return Err(Error::invalid_resource(format!(
                    "Custom resource '{}' must implement exactly one capability, found: {}",
                    descriptor.kind,
                    names.join(", ")
                )));
            }
        }

        if self
            .types
            .insert(descriptor.kind.clone(), Arc::new(resource))
            .is_some()
        {
            debug!("Replaced resource kind: {}", descriptor);
        } else {
            debug!("Registered resource kind: {}", descriptor);
        }
        Ok(())
    }

    /// Register a typed spec. See [`ResourceSpec`].
    pub fn register_spec<S: ResourceSpec>(&mut self) -> Result<()> {
        self.register(SpecResource::<S>::new())
    }

    /// Built-ins declare valid constants, so registration cannot fail.
    pub(crate) fn insert_builtin<S: ResourceSpec>(&mut self) {
        self.types
            .insert(S::KIND.to_string(), Arc::new(SpecResource::<S>::new()));
    }

    pub fn resolve(&self, kind: &str) -> Option<Arc<dyn ResourceType>> {
        self.types.get(kind).cloned()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.types.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.types.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
