//! Read-only queries against the Git environment of a project directory.

use crate::process::{CommandError, CommandRunner};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Snapshot of a project's Git state, taken fresh for every deployment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepositoryStatus {
    pub is_git_repo: bool,
    pub has_remote: bool,
    pub remote_name: String,
    #[serde(serialize_with = "crate::remote::serialize_redacted")]
    pub remote_url: String,
    pub current_branch: String,
}

/// Queries git without ever changing repository state
#[derive(Clone)]
pub struct RepositoryInspector {
    runner: Arc<dyn CommandRunner>,
}

impl RepositoryInspector {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn git(
        &self,
        cwd: &Path,
        args: &[&str],
    ) -> Result<crate::process::CommandOutput, CommandError> {
        self.runner.run(cwd, "git", args).await
    }

    /// Whether a usable `git` binary is on the PATH.
    ///
    /// Only a missing binary counts as "not installed"; a hung or
    /// unrunnable git is returned as an error.
    pub async fn is_installed(&self, cwd: &Path) -> Result<bool, CommandError> {
        match self.git(cwd, &["--version"]).await {
            Ok(output) => {
                if !output.success() {
                    warn!(stderr = %output.stderr.trim(), "git --version exited with an error");
                }
                Ok(output.success())
            }
            Err(CommandError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Inspect the repository rooted at `cwd` and the named remote.
    ///
    /// A missing repository or remote is reported in the status, not as an
    /// error; only failures to run git at all are returned as errors.
    pub async fn validate(
        &self,
        cwd: &Path,
        remote_name: &str,
    ) -> Result<GitRepositoryStatus, CommandError> {
        let mut status = GitRepositoryStatus {
            remote_name: remote_name.to_string(),
            ..Default::default()
        };

        let inside = self
            .git(cwd, &["rev-parse", "--is-inside-work-tree"])
            .await?;
        status.is_git_repo = inside.success() && inside.stdout_trimmed() == "true";
        if !status.is_git_repo {
            debug!(cwd = %cwd.display(), "Not inside a git work tree");
            return Ok(status);
        }

        if let Some(url) = self.get_remote_url(cwd, remote_name).await? {
            status.has_remote = true;
            status.remote_url = url;
        }
        status.current_branch = self.get_current_branch(cwd).await?;

        Ok(status)
    }

    /// URL of the named remote, or `None` when it is not configured
    pub async fn get_remote_url(
        &self,
        cwd: &Path,
        remote_name: &str,
    ) -> Result<Option<String>, CommandError> {
        let output = self.git(cwd, &["remote", "get-url", remote_name]).await?;
        if !output.success() {
            debug!(remote = remote_name, stderr = %output.stderr.trim(), "Remote not configured");
            return Ok(None);
        }
        let url = output.stdout_trimmed();
        Ok((!url.is_empty()).then(|| url.to_string()))
    }

    /// Name of the checked-out branch (also on an unborn branch);
    /// `HEAD` when detached, empty when it cannot be determined
    pub async fn get_current_branch(&self, cwd: &Path) -> Result<String, CommandError> {
        let symbolic = self.git(cwd, &["symbolic-ref", "--short", "HEAD"]).await?;
        if symbolic.success() {
            return Ok(symbolic.stdout_trimmed().to_string());
        }

        let parsed = self.git(cwd, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        Ok(if parsed.success() {
            parsed.stdout_trimmed().to_string()
        } else {
            String::new()
        })
    }
}
