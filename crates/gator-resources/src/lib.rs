//! Gator Resources — the changeset resource model
//!
//! Each built-in resource is a self-contained file in src/resources/.
//! To add a built-in: create the file, implement `ResourceSpec` plus `Filter`
//! or `CodeChange`, and register it in `create_default_registry()` below.
//! Embedding applications register their own kinds the same way before
//! parsing any changeset.

pub mod changeset;
pub mod content;
pub mod model;
pub mod registry;
pub mod resources;
pub mod schema;

pub use changeset::{build_changeset, build_resource, Changeset, ChangesetSpec};
pub use content::{recursive_path_contents, ContentIter, RecursiveContents};
pub use model::{Behavior, CodeChange, Filter, GatorResource};
pub use registry::{ResourceRegistry, ResourceSpec, ResourceType, SpecResource};
pub use resources::{NewFile, RegexFilter, RegexReplace, RemoveFile};

/// Create a registry holding every built-in resource kind.
pub fn create_default_registry() -> ResourceRegistry {
    let mut registry = ResourceRegistry::new();

    // --- Filters ---
    registry.insert_builtin::<resources::regex_filter::RegexFilterSpec>();

    // --- Code changes ---
    registry.insert_builtin::<resources::regex_replace::RegexReplaceSpec>();
    registry.insert_builtin::<resources::new_file::NewFileSpec>();
    registry.insert_builtin::<resources::remove_file::RemoveFileSpec>();

    registry
}
