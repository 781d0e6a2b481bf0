//! Handle to a local checkout and the git plumbing the evaluator builds on

use crate::command::{git, git_output, GitError, GitResult};
use chrono::{DateTime, Utc};
use gator_core::{Identity, GIT_INTERNALS_DIRECTORY};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const REMOTE_NAME: &str = "origin";

/// The most recent commit on some revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub author: Identity,
    pub committed_at: DateTime<Utc>,
}

/// A local working copy with an `origin` remote. Owns nothing but the path;
/// branch state lives in the repository itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    path: PathBuf,
}

impl WorkingCopy {
    pub fn open(path: impl AsRef<Path>) -> GitResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.join(GIT_INTERNALS_DIRECTORY).exists() {
            return Err(GitError::NotAWorkingCopy {
                path: path.display().to_string(),
            });
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run git in this working copy; non-zero exit is an error.
    pub fn git<S: AsRef<std::ffi::OsStr>>(&self, args: &[S]) -> GitResult<String> {
        git(Some(&self.path), args)
    }

    /// Run git and report only whether it succeeded. Spawn failures are still errors.
    fn git_succeeds<S: AsRef<std::ffi::OsStr>>(&self, args: &[S]) -> GitResult<bool> {
        let (_, output) = git_output(Some(&self.path), args)?;
        Ok(output.status.success())
    }

    /// Default branch as advertised by the remote (`origin/HEAD`).
    pub fn default_branch(&self) -> GitResult<String> {
        let head = format!("refs/remotes/{}/HEAD", REMOTE_NAME);
        let (_, output) = git_output(Some(&self.path), ["symbolic-ref", "--short", head.as_str()])?;
        if output.status.success() {
            let reference = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let prefix = format!("{}/", REMOTE_NAME);
            return Ok(reference
                .strip_prefix(&prefix)
                .unwrap_or(&reference)
                .to_string());
        }

        // No origin/HEAD, e.g. a remote added after cloning
        for candidate in ["main", "master"] {
            if self.remote_branch_exists(candidate)? {
                debug!("origin/HEAD missing, assuming default branch {}", candidate);
                return Ok(candidate.to_string());
            }
        }
        Err(GitError::UnexpectedOutput {
            args: format!("symbolic-ref --short {}", head),
            output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Name of the checked-out branch. A detached HEAD is an error.
    pub fn active_branch(&self) -> GitResult<String> {
        Ok(self
            .git(&["symbolic-ref", "--short", "HEAD"])?
            .trim()
            .to_string())
    }

    /// Untracked files, excluding ignored ones, relative to the root.
    pub fn untracked_files(&self) -> GitResult<Vec<String>> {
        Ok(split_nul(&self.git(&[
            "ls-files",
            "--others",
            "--exclude-standard",
            "-z",
        ])?))
    }

    /// Tracked files whose working-tree state differs from the index.
    pub fn changed_files(&self) -> GitResult<Vec<String>> {
        Ok(split_nul(&self.git(&["diff", "--name-only", "-z"])?))
    }

    pub fn remote_branch_exists(&self, branch: &str) -> GitResult<bool> {
        let reference = remote_ref(branch);
        self.git_succeeds(&["rev-parse", "--verify", "--quiet", reference.as_str()])
    }

    pub fn local_branch_exists(&self, branch: &str) -> GitResult<bool> {
        let reference = format!("refs/heads/{}", branch);
        self.git_succeeds(&["rev-parse", "--verify", "--quiet", reference.as_str()])
    }

    pub fn rev_parse(&self, revision: &str) -> GitResult<String> {
        let verify = format!("{}^{{commit}}", revision);
        Ok(self
            .git(&["rev-parse", "--verify", verify.as_str()])?
            .trim()
            .to_string())
    }

    pub fn last_commit(&self, revision: &str) -> GitResult<CommitInfo> {
        let args = ["log", "-1", "--format=%H%x00%an%x00%ae%x00%cI", revision, "--"];
        let output = self.git(&args)?;
        let fields: Vec<&str> = output.trim_end().split('\0').collect();
        let parsed = match fields.as_slice() {
            [sha, name, email, time] => DateTime::parse_from_rfc3339(time)
                .ok()
                .map(|time| CommitInfo {
                    sha: sha.to_string(),
                    author: Identity::new(*name, *email),
                    committed_at: time.with_timezone(&Utc),
                }),
            _ => None,
        };
        parsed.ok_or_else(|| GitError::UnexpectedOutput {
            args: args.join(" "),
            output,
        })
    }

    /// Stage every change, including deletions and untracked files.
    pub fn stage_all(&self) -> GitResult<()> {
        self.git(&["add", "--all"])?;
        Ok(())
    }

    /// Unstage everything; the working tree is untouched.
    pub fn reset_index(&self) -> GitResult<()> {
        self.git(&["reset", "--quiet"])?;
        Ok(())
    }

    /// Stage and commit everything as `identity`. Returns the new commit sha.
    pub fn commit_all(&self, identity: &Identity, message: &str) -> GitResult<String> {
        self.stage_all()?;
        let name = format!("user.name={}", identity.name);
        let email = format!("user.email={}", identity.email);
        self.git(&[
            "-c",
            name.as_str(),
            "-c",
            email.as_str(),
            "-c",
            "commit.gpgsign=false",
            "commit",
            "--quiet",
            "--no-verify",
            "-m",
            message,
        ])?;
        self.rev_parse("HEAD")
    }

    /// Overwrite `branch` on the remote with the local branch of the same name.
    pub fn force_push(&self, branch: &str) -> GitResult<()> {
        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        self.git(&["push", "--force", "--quiet", REMOTE_NAME, refspec.as_str()])?;
        Ok(())
    }

    pub fn fetch(&self) -> GitResult<()> {
        self.git(&["fetch", "--prune", "--quiet", REMOTE_NAME])?;
        Ok(())
    }

    pub fn set_remote_url(&self, url: &str) -> GitResult<()> {
        self.git(&["remote", "set-url", REMOTE_NAME, url])?;
        Ok(())
    }

    pub fn checkout(&self, branch: &str) -> GitResult<()> {
        self.git(&["checkout", "--quiet", branch])?;
        Ok(())
    }

    /// Create (or reset) `branch` at `start` and check it out.
    pub fn checkout_new_branch(&self, branch: &str, start: &str) -> GitResult<()> {
        self.git(&["checkout", "--quiet", "-B", branch, start])?;
        Ok(())
    }

    pub fn delete_branch(&self, branch: &str) -> GitResult<()> {
        self.git(&["branch", "--quiet", "-D", branch])?;
        Ok(())
    }

    /// Remove untracked and ignored files, then drop uncommitted changes.
    pub fn discard_changes(&self) -> GitResult<()> {
        self.git(&["clean", "-xdf", "--quiet"])?;
        self.git(&["reset", "--hard", "--quiet"])?;
        Ok(())
    }
}

pub fn remote_ref(branch: &str) -> String {
    format!("refs/remotes/{}/{}", REMOTE_NAME, branch)
}

fn split_nul(output: &str) -> Vec<String> {
    output
        .split('\0')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
