//! Timeout-bounded subprocess execution.
//!
//! Every external program the deployer touches (git, and anything a publisher
//! shells out to) goes through [`CommandRunner`], so tests can substitute a
//! scripted fake and production calls always carry a deadline.

use crate::remote::redact_credentials;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Trimmed stdout, the usual shape of a git query answer
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Turn a non-zero exit into [`CommandError::Failed`]
    pub fn check(self, command: &str) -> Result<CommandOutput, CommandError> {
        if self.success() {
            return Ok(self);
        }
        let stderr = if self.stderr.trim().is_empty() {
            redact_credentials(self.stdout.trim())
        } else {
            redact_credentials(self.stderr.trim())
        };
        Err(CommandError::Failed {
            command: command.to_string(),
            status: self
                .status
                .map(|code| code.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            stderr,
        })
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("'{program}' is not installed or not in PATH")]
    NotFound { program: String },

    #[error("Failed to execute '{command}': {source}")]
    Io {
        command: String,
        source: std::io::Error,
    },

    #[error("'{command}' timed out after {}s", .after.as_secs())]
    Timeout { command: String, after: Duration },

    #[error("'{command}' failed with status {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

impl CommandError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CommandError::Timeout { .. })
    }
}

/// Runs an external program in an explicit working directory
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        cwd: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<CommandOutput, CommandError>;
}

/// Render a command line for logs and error messages
pub fn command_line(program: &str, args: &[&str]) -> String {
    let line = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    redact_credentials(&line)
}

/// [`CommandRunner`] backed by `tokio::process`, killing children that
/// outlive the deadline
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
    envs: Vec<(String, String)>,
}

impl ProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            envs: Vec::new(),
        }
    }

    /// Runner for git: never prompt for credentials on a terminal
    pub fn for_git(timeout: Duration) -> Self {
        Self::new(timeout).env("GIT_TERMINAL_PROMPT", "0")
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        cwd: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<CommandOutput, CommandError> {
        let line = command_line(program, args);

        // A missing cwd would otherwise surface as a missing program
        if !cwd.is_dir() {
            return Err(CommandError::Io {
                command: line,
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("working directory does not exist: {}", cwd.display()),
                ),
            });
        }

        debug!(cwd = %cwd.display(), command = %line, "Running command");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return Err(CommandError::Timeout {
                    command: line,
                    after: self.timeout,
                });
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CommandError::NotFound {
                    program: program.to_string(),
                });
            }
            Ok(Err(e)) => {
                return Err(CommandError::Io {
                    command: line,
                    source: e,
                });
            }
            Ok(Ok(output)) => output,
        };

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
