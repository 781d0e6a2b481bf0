//! Gator Git — repository state evaluation over a local working copy
//!
//! Everything here shells out to the `git` binary and blocks. Callers that
//! run on an async runtime should move this work onto a blocking thread.

pub mod branch;
pub mod command;
pub mod evaluator;
pub mod provider;
pub mod working_copy;

pub use branch::{random_branch_name, with_feature_branch};
pub use command::{GitError, GitResult};
pub use evaluator::{
    compute_diff, has_human_commits, has_uncommitted_changes, is_current_branch_stale,
    local_matches_remote, reset_to_default_branch,
};
pub use provider::{GitCliProvider, VcsProvider};
pub use working_copy::{CommitInfo, WorkingCopy};
