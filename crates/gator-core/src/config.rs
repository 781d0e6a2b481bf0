//! Run configuration
//!
//! Loaded once from TOML at startup, with credentials optionally supplied
//! through `GATOR_GITHUB_*` environment variables. Unlike most tunables, a
//! broken configuration is fatal: nothing runs against repositories until it
//! validates.

use crate::error::{Error, Result};
use crate::types::{Identity, RepositoryName, DEFAULT_AUTOMATION_LABEL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_GITHUB_USERNAME: &str = "GATOR_GITHUB_USERNAME";
pub const ENV_GITHUB_TOKEN: &str = "GATOR_GITHUB_TOKEN";
pub const ENV_GITHUB_DOMAIN: &str = "GATOR_GITHUB_DOMAIN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Configuration {
    /// Compute diffs only; never push, open or update anything.
    pub dry_run: bool,
    /// Target repositories in `owner/name` form.
    pub repositories: Vec<String>,
    /// Code host domain, e.g. "github.com" or a GitHub Enterprise host.
    pub github_domain: String,
    /// Account the automation acts as. Also the commit author name.
    pub github_username: String,
    pub github_token: String,
    /// Commit email; defaults to the host's noreply address for the user.
    pub commit_email: Option<String>,
    /// Where working copies are cloned, one subdirectory per repository.
    pub clone_directory: PathBuf,
    /// Labels applied to every issue and pull request.
    pub labels: Vec<String>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            dry_run: false,
            repositories: Vec::new(),
            github_domain: "github.com".into(),
            github_username: String::new(),
            github_token: String::new(),
            commit_email: None,
            clone_directory: PathBuf::from("cloned_repos"),
            labels: vec![DEFAULT_AUTOMATION_LABEL.to_string()],
        }
    }
}

impl Configuration {
    /// Load a configuration file. Missing or malformed files are errors.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Apply credential overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the environment, in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(username) = lookup(ENV_GITHUB_USERNAME).filter(|v| !v.is_empty()) {
            self.github_username = username;
        }
        if let Some(token) = lookup(ENV_GITHUB_TOKEN).filter(|v| !v.is_empty()) {
            self.github_token = token;
        }
        if let Some(domain) = lookup(ENV_GITHUB_DOMAIN).filter(|v| !v.is_empty()) {
            self.github_domain = domain;
        }
    }

    /// Check everything a run needs before any repository is touched.
    pub fn validate(&self) -> Result<()> {
        if self.github_username.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "github_username is required (or set {})",
                ENV_GITHUB_USERNAME
            )));
        }
        if self.github_token.trim().is_empty() {
            return Err(Error::Configuration(format!(
                "github_token is required (or set {})",
                ENV_GITHUB_TOKEN
            )));
        }
        if self.github_domain.trim().is_empty() {
            return Err(Error::Configuration("github_domain must not be empty".into()));
        }
        self.repository_names()?;
        Ok(())
    }

    pub fn repository_names(&self) -> Result<Vec<RepositoryName>> {
        self.repositories.iter().map(|r| r.parse()).collect()
    }

    /// Identity recorded on automated commits; `has_human_commits` compares against it.
    pub fn automation_identity(&self) -> Identity {
        let email = self.commit_email.clone().unwrap_or_else(|| {
            format!("{}@users.noreply.{}", self.github_username, self.github_domain)
        });
        Identity::new(self.github_username.clone(), email)
    }

    pub fn clone_path(&self, repo: &RepositoryName) -> PathBuf {
        self.clone_directory.join(&repo.name)
    }
}
