//! VCS provider — obtains an up-to-date working copy of a remote repository

use crate::command::git;
use crate::working_copy::{remote_ref, WorkingCopy};
use gator_core::{Result, GIT_INTERNALS_DIRECTORY};
use std::path::Path;
use tracing::{debug, info};

/// Produces a local working copy that matches the remote's default branch.
pub trait VcsProvider: Send + Sync {
    /// Clone `url` into `path`, or bring an existing clone up to date.
    /// The returned copy is clean and on its default branch.
    fn clone_or_update(&self, url: &str, path: &Path) -> Result<WorkingCopy>;
}

/// Provider backed by the `git` command line. Clones keep full history, which
/// staleness checks rely on.
#[derive(Debug, Clone, Default)]
pub struct GitCliProvider;

impl GitCliProvider {
    pub fn new() -> Self {
        Self
    }
}

impl VcsProvider for GitCliProvider {
    fn clone_or_update(&self, url: &str, path: &Path) -> Result<WorkingCopy> {
        if path.join(GIT_INTERNALS_DIRECTORY).exists() {
            let wc = WorkingCopy::open(path)?;
            debug!("Updating existing clone at {}", path.display());
            wc.set_remote_url(url)?;
            wc.fetch()?;

            let default_branch = wc.default_branch()?;
            wc.discard_changes()?;
            wc.checkout_new_branch(&default_branch, &remote_ref(&default_branch))?;
            info!("Updated {} to origin/{}", path.display(), default_branch);
            return Ok(wc);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        git(None, [
            std::ffi::OsStr::new("clone"),
            std::ffi::OsStr::new("--quiet"),
            std::ffi::OsStr::new(url),
            path.as_os_str(),
        ])?;
        info!("Cloned into {}", path.display());
        Ok(WorkingCopy::open(path)?)
    }
}
