//! gator — apply changesets across many repositories
//!
//! The changeset model lives in `gator-resources`, repository state checks in
//! `gator-git` and code-host access in `gator-host`. This crate wires them
//! together per repository and exposes the CLI.

pub mod context;
pub mod orchestrator;

pub use context::{load_changeset, RunContext};
pub use orchestrator::{HostAction, Orchestrator, Outcome, RunReport};
