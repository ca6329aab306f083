//! Publishes a directory to a branch of a Git remote, the way GitHub Pages
//! expects to find a site.
//!
//! The branch is checked out into a scratch directory (or created as an
//! orphan when the remote does not have it yet), the build output is copied
//! on top, and the result is committed and pushed. The project's own working
//! tree and index are never touched.

use crate::error::PublishError;
use crate::process::{CommandError, CommandOutput, CommandRunner, command_line};
use crate::publish::{PublishRequest, Publisher};
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

const FALLBACK_NAME: &str = "Portfolio Kit";
const FALLBACK_EMAIL: &str = "portfolio-kit@users.noreply.github.com";

/// [`Publisher`] that pushes with the `git` binary
#[derive(Clone)]
pub struct GitPagesPublisher {
    runner: Arc<dyn CommandRunner>,
}

impl GitPagesPublisher {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn git(&self, cwd: &Path, args: &[&str]) -> Result<CommandOutput, CommandError> {
        let output = self.runner.run(cwd, "git", args).await?;
        output.check(&command_line("git", args))
    }

    /// `git config --get <key>` in the project, if set
    async fn config_value(&self, cwd: &Path, key: &str) -> Option<String> {
        match self.runner.run(cwd, "git", &["config", "--get", key]).await {
            Ok(output) if output.success() && !output.stdout_trimmed().is_empty() => {
                Some(output.stdout_trimmed().to_string())
            }
            _ => None,
        }
    }

    async fn branch_exists(
        &self,
        scratch: &Path,
        repository_url: &str,
        branch: &str,
    ) -> Result<bool, CommandError> {
        let heads = self
            .git(scratch, &["ls-remote", "--heads", repository_url, branch])
            .await?;
        Ok(!heads.stdout_trimmed().is_empty())
    }
}

#[async_trait]
impl Publisher for GitPagesPublisher {
    async fn publish(&self, cwd: &Path, request: &PublishRequest) -> Result<(), PublishError> {
        let repository_url = absolute_url(cwd, &request.repository_url);
        let scratch = tempfile::Builder::new()
            .prefix("portfolio-kit-pages-")
            .tempdir()?;
        let checkout = scratch.path().join("site");
        let checkout_str = checkout.to_string_lossy().into_owned();

        if self
            .branch_exists(scratch.path(), &repository_url, &request.branch)
            .await?
        {
            debug!(branch = %request.branch, "Cloning existing branch");
            self.git(
                scratch.path(),
                &[
                    "clone",
                    "--branch",
                    &request.branch,
                    "--single-branch",
                    "--depth",
                    "1",
                    "--origin",
                    &request.remote,
                    &repository_url,
                    &checkout_str,
                ],
            )
            .await?;
        } else {
            debug!(branch = %request.branch, "Branch not on remote yet; starting an orphan");
            fs::create_dir_all(&checkout)?;
            let head = format!("refs/heads/{}", request.branch);
            self.git(&checkout, &["init", "--quiet"]).await?;
            self.git(&checkout, &["symbolic-ref", "HEAD", &head]).await?;
            self.git(&checkout, &["remote", "add", &request.remote, &repository_url])
                .await?;
        }

        if !request.add {
            self.git(&checkout, &["rm", "-r", "--quiet", "--ignore-unmatch", "."])
                .await?;
        }

        let copied = copy_tree(&request.source_dir, &checkout, request.dotfiles)?;
        debug!(files = copied, "Copied build output");

        self.git(&checkout, &["add", "--all"]).await?;
        let changes = self.git(&checkout, &["status", "--porcelain"]).await?;
        if changes.stdout_trimmed().is_empty() {
            info!(branch = %request.branch, "Nothing changed since the last deployment");
            return Ok(());
        }

        let name = self
            .config_value(cwd, "user.name")
            .await
            .unwrap_or_else(|| FALLBACK_NAME.to_string());
        let email = self
            .config_value(cwd, "user.email")
            .await
            .unwrap_or_else(|| FALLBACK_EMAIL.to_string());
        let name_arg = format!("user.name={}", name);
        let email_arg = format!("user.email={}", email);
        self.git(
            &checkout,
            &[
                "-c",
                &name_arg,
                "-c",
                &email_arg,
                "commit",
                "--quiet",
                "-m",
                &request.message,
            ],
        )
        .await?;

        let mut push = vec!["push"];
        if request.force {
            push.push("--force");
        }
        push.push(request.remote.as_str());
        push.push(request.branch.as_str());
        self.git(&checkout, &push).await?;

        info!(branch = %request.branch, remote = %request.remote, "Pushed site");
        Ok(())
    }
}

/// Resolve a relative local remote path against the project directory,
/// since git runs from a scratch directory
fn absolute_url(cwd: &Path, url: &str) -> String {
    let is_url = url.contains("://")
        || url
            .split_once(':')
            .is_some_and(|(before, _)| !before.is_empty() && !before.contains('/'));
    if is_url || Path::new(url).is_absolute() {
        url.to_string()
    } else {
        cwd.join(url).to_string_lossy().into_owned()
    }
}

/// Copy `source` into `dest`, skipping `.git` always and other dotfiles
/// unless asked. Returns the number of files copied.
fn copy_tree(source: &Path, dest: &Path, dotfiles: bool) -> std::io::Result<usize> {
    let mut copied = 0;
    let walker = WalkDir::new(source).min_depth(1).into_iter().filter_entry(|entry| {
        let name = entry.file_name().to_string_lossy();
        name != ".git" && (dotfiles || !name.starts_with('.'))
    });

    for entry in walker {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    Ok(copied)
}
