//! `git` subprocess runner and its error type

use std::ffi::OsStr;
use std::io;
use std::path::Path;
use std::process::{Command, Output};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("failed to run git {args}: {source}")]
    Spawn {
        args: String,
        #[source]
        source: io::Error,
    },

    #[error("git {args} exited with {status}: {stderr}")]
    Failed {
        args: String,
        status: String,
        stderr: String,
    },

    #[error("{path} is not a git working copy")]
    NotAWorkingCopy { path: String },

    #[error("unexpected git output from {args}: {output}")]
    UnexpectedOutput { args: String, output: String },

    #[error("{0}")]
    Io(#[from] io::Error),
}

pub type GitResult<T> = std::result::Result<T, GitError>;

impl GitError {
    /// The git invocation that failed, for reporting.
    pub fn operation(&self) -> String {
        match self {
            Self::Spawn { args, .. }
            | Self::Failed { args, .. }
            | Self::UnexpectedOutput { args, .. } => format!("git {}", args),
            Self::NotAWorkingCopy { .. } => "open working copy".into(),
            Self::Io(_) => "filesystem".into(),
        }
    }

    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

impl From<GitError> for gator_core::Error {
    fn from(err: GitError) -> Self {
        let message = match &err {
            GitError::Failed { stderr, status, .. } => format!("{} ({})", stderr, status),
            other => other.to_string(),
        };
        gator_core::Error::git_operation(err.operation(), message)
    }
}

/// Run git in `dir` and return the raw output, whatever the exit status.
pub fn git_output<I, S>(dir: Option<&Path>, args: I) -> GitResult<(String, Output)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let shown = display_args(&args);

    let mut cmd = Command::new("git");
    cmd.args(&args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("LC_ALL", "C");
    if let Some(dir) = dir {
        cmd.current_dir(dir);
    }

    debug!("git {}", shown);
    let output = cmd.output().map_err(|source| GitError::Spawn {
        args: shown.clone(),
        source,
    })?;
    Ok((shown, output))
}

/// Run git in `dir`; a non-zero exit is an error. Returns stdout.
pub fn git<I, S>(dir: Option<&Path>, args: I) -> GitResult<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let (shown, output) = git_output(dir, args)?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(GitError::Failed {
            args: shown,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

fn display_args<S: AsRef<OsStr>>(args: &[S]) -> String {
    args.iter()
        .map(|a| redact_credentials(&a.as_ref().to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hide the userinfo part of URLs so tokens never reach logs or errors.
pub fn redact_credentials(arg: &str) -> String {
    if let Some((scheme, rest)) = arg.split_once("://") {
        let authority_end = rest.find('/').unwrap_or(rest.len());
        if let Some(at) = rest[..authority_end].rfind('@') {
            return format!("{}://***@{}", scheme, &rest[at + 1..]);
        }
    }
    arg.to_string()
}
