//! Repository state evaluator
//!
//! Answers the questions that decide whether a pull request is warranted:
//! did the change alter tracked content, has a human taken over the branch,
//! is the pushed branch behind the default branch, and would pushing again
//! change anything. "Branch does not exist" is a negative answer, never an
//! error.

use crate::command::GitResult;
use crate::working_copy::{remote_ref, WorkingCopy, REMOTE_NAME};
use gator_core::{Identity, Result};
use std::path::Path;
use tracing::{debug, warn};

/// Stage every change and return the staged diff against the last commit.
///
/// Untracked files are added, modified files are added, and tracked files
/// that no longer exist are staged as removals, so new, changed and deleted
/// files all show up.
pub fn compute_diff(wc: &WorkingCopy) -> Result<String> {
    let mut items = wc.untracked_files()?;
    items.extend(wc.changed_files()?);
    items.sort();
    items.dedup();

    let (additions, removals): (Vec<String>, Vec<String>) = items
        .into_iter()
        .partition(|item| wc.path().join(Path::new(item)).symlink_metadata().is_ok());

    if !additions.is_empty() {
        let mut args = vec!["add".to_string(), "--".to_string()];
        args.extend(additions);
        wc.git(&args)?;
    }
    if !removals.is_empty() {
        let mut args = vec![
            "rm".to_string(),
            "--cached".to_string(),
            "-r".to_string(),
            "--quiet".to_string(),
            "--".to_string(),
        ];
        args.extend(removals);
        wc.git(&args)?;
    }

    Ok(wc.git(&["diff", "--cached", "--no-color", "--no-ext-diff"])?)
}

/// Whether the latest commit on `origin/<branch>` was made by someone other
/// than `automation`. False when the remote branch does not exist.
pub fn has_human_commits(wc: &WorkingCopy, branch: &str, automation: &Identity) -> Result<bool> {
    debug!(
        "Checking {} for human commits on {}",
        wc.path().display(),
        branch
    );
    if !wc.remote_branch_exists(branch)? {
        debug!("Branch {} does not exist on {}", branch, REMOTE_NAME);
        return Ok(false);
    }

    let commit = wc.last_commit(&remote_ref(branch))?;
    debug!(
        "Most recent commit author: {} at {}",
        commit.author.name, commit.committed_at
    );
    Ok(commit.author.name != automation.name)
}

/// Whether the local state of the active branch, uncommitted changes
/// included, is identical to `origin/<active branch>`.
///
/// The index is restored afterwards on every path, including errors.
pub fn local_matches_remote(wc: &WorkingCopy) -> Result<bool> {
    let active = wc.active_branch()?;
    if !wc.remote_branch_exists(&active)? {
        debug!(
            "{} has no {}/{}, so local changes do not match remote",
            wc.path().display(),
            REMOTE_NAME,
            active
        );
        return Ok(false);
    }

    let _restore = IndexGuard { wc };
    wc.stage_all()?;
    let remote = remote_ref(&active);
    let diff = wc.git(&["diff", "--cached", "--no-color", "--no-ext-diff", remote.as_str()])?;
    let untracked = wc.untracked_files()?;
    Ok(diff.is_empty() && untracked.is_empty())
}

/// Any untracked files or unstaged changes. Local only, no network.
pub fn has_uncommitted_changes(wc: &WorkingCopy) -> Result<bool> {
    if !wc.untracked_files()?.is_empty() {
        return Ok(true);
    }
    Ok(!wc.git(&["diff", "--no-color", "--no-ext-diff"])?.is_empty())
}

/// Whether `origin/<active branch>` is missing the default branch's latest commit.
///
/// Requires full history; shallow or partial clones give unreliable answers.
/// A branch that was never pushed counts as stale.
pub fn is_current_branch_stale(wc: &WorkingCopy) -> Result<bool> {
    let default_branch = wc.default_branch()?;
    let default_tip = if wc.local_branch_exists(&default_branch)? {
        wc.rev_parse(&format!("refs/heads/{}", default_branch))?
    } else {
        wc.rev_parse(&remote_ref(&default_branch))?
    };

    let active = wc.active_branch()?;
    let up_to_date = wc.git(&[
        "branch",
        "--remotes",
        "--format=%(refname)",
        "--contains",
        default_tip.as_str(),
    ])?;
    let tracking = remote_ref(&active);
    let stale = !up_to_date.lines().any(|line| line.trim() == tracking);
    debug!(
        "{} stale relative to {} ({}): {}",
        active, default_branch, default_tip, stale
    );
    Ok(stale)
}

/// Discard all local changes and check out the default branch.
pub fn reset_to_default_branch(wc: &WorkingCopy) -> Result<()> {
    let default_branch = wc.default_branch()?;
    wc.discard_changes()?;
    wc.checkout(&default_branch)?;
    debug!(
        "Moved back to {} branch for {}",
        default_branch,
        wc.path().display()
    );
    Ok(())
}

/// Unstages everything when dropped.
struct IndexGuard<'a> {
    wc: &'a WorkingCopy,
}

impl Drop for IndexGuard<'_> {
    fn drop(&mut self) {
        let reset: GitResult<()> = self.wc.reset_index();
        if let Err(e) = reset {
            warn!("Failed to reset index in {}: {}", self.wc.path().display(), e);
        }
    }
}
