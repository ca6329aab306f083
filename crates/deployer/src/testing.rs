//! Scripted stand-ins for git, the site build and the publish primitive.
//!
//! Enabled for this crate's tests and, through the `test-util` feature, for
//! downstream crates that drive a [`crate::DeploymentPipeline`] in tests.

use crate::build::{BuildCancellation, SiteBuilder};
use crate::error::PublishError;
use crate::process::{CommandError, CommandOutput, CommandRunner};
use crate::publish::{PublishRequest, Publisher};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        status: Some(0),
        stdout: format!("{}\n", stdout),
        stderr: String::new(),
    }
}

fn fail(status: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        status: Some(status),
        stdout: String::new(),
        stderr: format!("{}\n", stderr),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub cwd: PathBuf,
    pub program: String,
    pub args: Vec<String>,
}

/// Answers the read-only git queries the inspector makes
#[derive(Debug, Default)]
pub struct FakeGit {
    installed: bool,
    hangs: bool,
    repo: bool,
    remotes: Vec<(String, String)>,
    branch: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeGit {
    pub fn not_installed() -> Self {
        Self::default()
    }

    /// Every call runs into its deadline
    pub fn timing_out() -> Self {
        Self {
            installed: true,
            hangs: true,
            ..Default::default()
        }
    }

    /// Git installed, directory is not a repository
    pub fn empty_dir() -> Self {
        Self {
            installed: true,
            ..Default::default()
        }
    }

    /// Repository on `main` with no remotes
    pub fn repo() -> Self {
        Self {
            installed: true,
            repo: true,
            branch: Some("main".to_string()),
            ..Default::default()
        }
    }

    pub fn with_remote(mut self, name: &str, url: &str) -> Self {
        self.remotes.push((name.to_string(), url.to_string()));
        self
    }

    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    pub fn detached(mut self) -> Self {
        self.branch = None;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Whether any call was something other than a known read-only query
    pub fn mutated(&self) -> bool {
        lock(&self.calls).iter().any(|call| {
            let args: Vec<&str> = call.args.iter().map(String::as_str).collect();
            !matches!(
                args.as_slice(),
                ["--version"]
                    | ["rev-parse", ..]
                    | ["remote", "get-url", _]
                    | ["symbolic-ref", "--short", "HEAD"]
            )
        })
    }
}

#[async_trait]
impl CommandRunner for FakeGit {
    async fn run(
        &self,
        cwd: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<CommandOutput, CommandError> {
        lock(&self.calls).push(RecordedCall {
            cwd: cwd.to_path_buf(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });

        if !self.installed || program != "git" {
            return Err(CommandError::NotFound {
                program: program.to_string(),
            });
        }
        if self.hangs {
            return Err(CommandError::Timeout {
                command: format!("git {}", args.join(" ")),
                after: Duration::from_secs(30),
            });
        }

        let output = match args {
            ["--version"] => ok("git version 2.43.0"),
            ["rev-parse", "--is-inside-work-tree"] if self.repo => ok("true"),
            ["rev-parse", "--is-inside-work-tree"] => fail(
                128,
                "fatal: not a git repository (or any of the parent directories): .git",
            ),
            ["remote", "get-url", name] => self
                .remotes
                .iter()
                .find(|(remote, _)| remote == name)
                .map(|(_, url)| ok(url))
                .unwrap_or_else(|| fail(2, &format!("error: No such remote '{}'", name))),
            ["symbolic-ref", "--short", "HEAD"] => match &self.branch {
                Some(branch) => ok(branch),
                None => fail(128, "fatal: ref HEAD is not a symbolic ref"),
            },
            ["rev-parse", "--abbrev-ref", "HEAD"] => ok(self.branch.as_deref().unwrap_or("HEAD")),
            _ => fail(1, "unsupported by FakeGit"),
        };
        Ok(output)
    }
}

/// Records build invocations; writes an `index.html` on success
#[derive(Debug, Default)]
pub struct FakeBuilder {
    failure: Option<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(PathBuf, PathBuf, String)>>,
}

impl FakeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    /// (cwd, output_dir, base_url) per call
    pub fn calls(&self) -> Vec<(PathBuf, PathBuf, String)> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl SiteBuilder for FakeBuilder {
    async fn build(
        &self,
        cwd: &Path,
        output_dir: &Path,
        base_url: &str,
        cancel: &BuildCancellation,
    ) -> anyhow::Result<()> {
        lock(&self.calls).push((
            cwd.to_path_buf(),
            output_dir.to_path_buf(),
            base_url.to_string(),
        ));
        if let Some(delay) = self.delay {
            let deadline = tokio::time::Instant::now() + delay;
            while tokio::time::Instant::now() < deadline {
                if cancel.is_cancelled() {
                    anyhow::bail!("Build cancelled");
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
        if let Some(message) = &self.failure {
            anyhow::bail!("{}", message);
        }
        std::fs::create_dir_all(output_dir)?;
        std::fs::write(output_dir.join("index.html"), "<h1>portfolio</h1>")?;
        Ok(())
    }
}

/// Records publish requests together with the files present at publish time
#[derive(Debug, Default)]
pub struct FakePublisher {
    failure: Option<String>,
    times_out: bool,
    delay: Option<Duration>,
    requests: Mutex<Vec<PublishRequest>>,
    staged: Mutex<Vec<Vec<String>>>,
}

impl FakePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with the given raw error text
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// Fails as if a git subprocess hit its deadline
    pub fn timing_out() -> Self {
        Self {
            times_out: true,
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<PublishRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Sorted file names found in the source directory, per call
    pub fn staged_files(&self) -> Vec<Vec<String>> {
        lock(&self.staged).clone()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(&self, _cwd: &Path, request: &PublishRequest) -> Result<(), PublishError> {
        let mut files: Vec<String> = std::fs::read_dir(&request.source_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        files.sort();
        lock(&self.staged).push(files);
        lock(&self.requests).push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.times_out {
            return Err(PublishError::Command(CommandError::Timeout {
                command: format!("git push {} {}", request.remote, request.branch),
                after: Duration::from_secs(1),
            }));
        }
        match &self.failure {
            Some(message) => Err(PublishError::Other(message.clone())),
            None => Ok(()),
        }
    }
}
