use crate::classify::{Classification, ErrorCode, classify};
use crate::process::CommandError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A failed pre-flight gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreflightIssue {
    GitNotInstalled,
    NotARepository,
    NoRemote { remote: String },
    NoProjectData,
}

impl PreflightIssue {
    pub fn message(&self) -> &'static str {
        match self {
            PreflightIssue::GitNotInstalled => "Git is not installed or not in PATH",
            PreflightIssue::NotARepository => "Not a Git repository",
            PreflightIssue::NoRemote { .. } => "No Git remote configured",
            PreflightIssue::NoProjectData => "No projects file found",
        }
    }

    pub fn solution(&self) -> String {
        match self {
            PreflightIssue::GitNotInstalled => {
                "Install Git from https://git-scm.com and make sure it is on your PATH.".to_string()
            }
            PreflightIssue::NotARepository => {
                "Run 'git init' in the project directory and commit your project.".to_string()
            }
            PreflightIssue::NoRemote { remote } => format!(
                "Add a remote with 'git remote add {} <repository-url>'.",
                remote
            ),
            PreflightIssue::NoProjectData => {
                "Create projects.yaml (or projects.yml, projects.json, projects.toml) in the project directory.".to_string()
            }
        }
    }
}

/// Failure reported by a [`crate::Publisher`]
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Failed to prepare files for publishing: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl PublishError {
    /// Classify using structure first, falling back to the text
    pub fn classify(&self) -> Classification {
        match self {
            PublishError::Command(CommandError::Timeout { .. }) => ErrorCode::Timeout.into(),
            PublishError::Command(CommandError::NotFound { .. }) => ErrorCode::GitError.into(),
            PublishError::Io(_) => ErrorCode::DeploymentError.into(),
            other => classify(&other.to_string()),
        }
    }
}

/// Deployment failure, tagged with the stage that produced it
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("{}", .0.message())]
    Preflight(PreflightIssue),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Build failed: {0}")]
    Build(String),

    #[error("Failed to write {}: {source}", .path.display())]
    Stage {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Publish failed: {0}")]
    Publish(#[from] PublishError),

    #[error("{stage} timed out after {}s", .after.as_secs())]
    Timeout { stage: &'static str, after: Duration },

    #[error("Git query failed: {0}")]
    Git(#[from] CommandError),
}

impl DeployError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DeployError::Preflight(_) => ErrorCode::ValidationError,
            DeployError::Config(_) => ErrorCode::ConfigError,
            DeployError::Build(_) => ErrorCode::BuildError,
            DeployError::Stage { .. } => ErrorCode::DeploymentError,
            DeployError::Publish(e) => e.classify().code,
            DeployError::Timeout { .. } => ErrorCode::Timeout,
            DeployError::Git(CommandError::Timeout { .. }) => ErrorCode::Timeout,
            DeployError::Git(_) => ErrorCode::GitError,
        }
    }

    /// Structured error body for results and API responses
    pub fn to_info(&self) -> ErrorInfo {
        let code = self.code();
        match self {
            DeployError::Preflight(issue) => ErrorInfo {
                code,
                message: issue.message().to_string(),
                details: None,
                solution: Some(issue.solution()),
            },
            DeployError::Config(details) | DeployError::Build(details) => ErrorInfo {
                code,
                message: code.summary().to_string(),
                details: Some(details.clone()),
                solution: Some(code.solution().to_string()),
            },
            DeployError::Timeout { .. } => ErrorInfo {
                code,
                message: self.to_string(),
                details: None,
                solution: Some(code.solution().to_string()),
            },
            DeployError::Publish(e) => {
                let classification = e.classify();
                ErrorInfo {
                    code,
                    message: classification.message.to_string(),
                    details: Some(e.to_string()),
                    solution: Some(classification.solution.to_string()),
                }
            }
            DeployError::Stage { .. } | DeployError::Git(_) => ErrorInfo {
                code,
                message: code.summary().to_string(),
                details: Some(self.to_string()),
                solution: Some(code.solution().to_string()),
            },
        }
    }
}

/// Error body of a failed [`crate::DeploymentResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preflight_is_validation_error() {
        let err = DeployError::Preflight(PreflightIssue::NoRemote {
            remote: "origin".to_string(),
        });
        let info = err.to_info();
        assert_eq!(info.code, ErrorCode::ValidationError);
        assert_eq!(info.message, "No Git remote configured");
        assert!(info.solution.unwrap().contains("git remote add origin"));
    }

    #[test]
    fn test_build_error_keeps_message_verbatim() {
        let raw = "Project data parse error in projects.yaml: missing field `title`";
        let info = DeployError::Build(raw.to_string()).to_info();
        assert_eq!(info.code, ErrorCode::BuildError);
        assert_eq!(info.details.as_deref(), Some(raw));
    }

    #[test]
    fn test_publish_error_classified_from_text() {
        let err = DeployError::Publish(PublishError::Other(
            "Permission denied (publickey)".to_string(),
        ));
        let info = err.to_info();
        assert_eq!(info.code, ErrorCode::AuthError);
        assert_eq!(info.details.as_deref(), Some("Permission denied (publickey)"));
        assert!(info.solution.unwrap().contains("personal access token"));
    }

    #[test]
    fn test_publish_timeout_is_structural() {
        // The command text mentions "rejected" but the timeout wins
        let err = PublishError::Command(CommandError::Timeout {
            command: "git push --rejected-looking-arg".to_string(),
            after: Duration::from_secs(3),
        });
        assert_eq!(err.classify().code, ErrorCode::Timeout);
        assert_eq!(DeployError::Publish(err).code(), ErrorCode::Timeout);
    }

    #[test]
    fn test_publish_io_is_not_text_classified() {
        let err = PublishError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "permission denied",
        ));
        assert_eq!(err.classify().code, ErrorCode::DeploymentError);
    }

    #[test]
    fn test_git_query_timeout() {
        let err = DeployError::Git(CommandError::Timeout {
            command: "git remote get-url origin".to_string(),
            after: Duration::from_secs(30),
        });
        assert_eq!(err.code(), ErrorCode::Timeout);
    }

    #[test]
    fn test_error_info_skips_empty_fields() {
        let info = DeployError::Preflight(PreflightIssue::NotARepository).to_info();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert!(json.get("details").is_none());
    }
}
