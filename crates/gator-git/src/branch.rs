//! Feature-branch scope
//!
//! `with_feature_branch` is the only place the checked-out branch changes
//! temporarily. The branch handle never escapes the closure, and the working
//! copy is back on its original branch on every exit path.

use crate::command::GitResult;
use crate::working_copy::WorkingCopy;
use gator_core::Result;
use tracing::{debug, warn};

/// A fresh branch name that cannot collide with concurrent workers.
pub fn random_branch_name() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Create `branch` from the current HEAD, run `f` on it, then discard any
/// leftover changes, return to the original branch and delete `branch`.
///
/// Commits and pushes made inside `f` survive on the remote; only the local
/// branch is removed. If `f` fails its error is returned even when restoring
/// also fails.
pub fn with_feature_branch<T, F>(wc: &WorkingCopy, branch: &str, f: F) -> Result<T>
where
    F: FnOnce(&WorkingCopy) -> Result<T>,
{
    let original = wc.active_branch()?;
    wc.checkout_new_branch(branch, "HEAD")?;
    debug!("Checked out feature branch {} from {}", branch, original);

    let guard = BranchGuard {
        wc,
        original,
        branch: branch.to_string(),
        restored: false,
    };

    let result = f(wc);
    let restored = guard.restore();
    match (result, restored) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(restore_err)) => {
            warn!("Failed to leave feature branch {}: {}", branch, restore_err);
            Err(e)
        }
    }
}

struct BranchGuard<'a> {
    wc: &'a WorkingCopy,
    original: String,
    branch: String,
    restored: bool,
}

impl BranchGuard<'_> {
    fn restore(mut self) -> GitResult<()> {
        self.restored = true;
        self.leave()
    }

    fn leave(&self) -> GitResult<()> {
        self.wc.discard_changes()?;
        self.wc.checkout(&self.original)?;
        self.wc.delete_branch(&self.branch)?;
        debug!("Returned to {} and deleted {}", self.original, self.branch);
        Ok(())
    }
}

impl Drop for BranchGuard<'_> {
    // Only reached without `restore` when the closure panicked.
    fn drop(&mut self) {
        if !self.restored {
            if let Err(e) = self.leave() {
                warn!("Failed to leave feature branch {}: {}", self.branch, e);
            }
        }
    }
}
