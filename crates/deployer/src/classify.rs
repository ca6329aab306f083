//! Error taxonomy and best-effort classification of raw failure text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of deployment error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    ConfigError,
    BuildError,
    GitError,
    AuthError,
    PushRejected,
    NetworkError,
    Timeout,
    DeploymentError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::BuildError => "BUILD_ERROR",
            ErrorCode::GitError => "GIT_ERROR",
            ErrorCode::AuthError => "AUTH_ERROR",
            ErrorCode::PushRejected => "PUSH_REJECTED",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::DeploymentError => "DEPLOYMENT_ERROR",
        }
    }

    /// Short human-readable description
    pub fn summary(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "Pre-deployment checks failed",
            ErrorCode::ConfigError => "Deployment configuration is incomplete",
            ErrorCode::BuildError => "Site build failed",
            ErrorCode::GitError => "Git operation failed",
            ErrorCode::AuthError => "Authentication with the Git remote failed",
            ErrorCode::PushRejected => "The remote rejected the push",
            ErrorCode::NetworkError => "Could not reach the Git remote",
            ErrorCode::Timeout => "A deployment step timed out",
            ErrorCode::DeploymentError => "Deployment failed",
        }
    }

    /// Fixed remediation hint
    pub fn solution(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => {
                "Fix the reported problem with your project or Git setup, then deploy again."
            }
            ErrorCode::ConfigError => {
                "Check portfolio.toml and make sure the Git remote has a URL (git remote -v)."
            }
            ErrorCode::BuildError => {
                "Fix the build error above (usually invalid project data), or run the build on its own to debug."
            }
            ErrorCode::GitError => {
                "Verify the repository and remote exist and that the branch name is valid."
            }
            ErrorCode::AuthError => {
                "Set up an SSH key for the remote, or use an HTTPS remote with a personal access token."
            }
            ErrorCode::PushRejected => {
                "Someone else updated the branch. Pull the latest changes, or deploy with --force to overwrite."
            }
            ErrorCode::NetworkError => {
                "Check your internet connection and the remote host, then try again."
            }
            ErrorCode::Timeout => {
                "The step took too long. Check your connection, or raise the timeout in portfolio.toml [deploy]."
            }
            ErrorCode::DeploymentError => {
                "Review the error details above; rerun with --verbose for more output."
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying a raw error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub code: ErrorCode,
    pub message: &'static str,
    pub solution: &'static str,
}

impl From<ErrorCode> for Classification {
    fn from(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.summary(),
            solution: code.solution(),
        }
    }
}

/// Substring rules, checked in order
const RULES: &[(ErrorCode, &[&str])] = &[
    (
        ErrorCode::AuthError,
        &[
            "permission denied",
            "authentication",
            "could not read username",
            "could not read password",
            "access denied",
            "error: 403",
        ],
    ),
    (
        ErrorCode::PushRejected,
        &["rejected", "conflict", "non-fast-forward", "fetch first"],
    ),
    (
        ErrorCode::NetworkError,
        &[
            "timeout",
            "timed out",
            "connection refused",
            "could not resolve host",
            "network is unreachable",
            "connection reset",
        ],
    ),
    (
        ErrorCode::GitError,
        &[
            "not found",
            "does not exist",
            "not a git repository",
            "does not appear to be a git repository",
            "fatal:",
        ],
    ),
];

/// Classify raw error text (case-insensitive substring match).
///
/// Anything unmatched falls back to [`ErrorCode::DeploymentError`]; the raw
/// text is always reported alongside, so a wrong guess stays visible.
pub fn classify(raw: &str) -> Classification {
    let haystack = raw.to_lowercase();
    RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|needle| haystack.contains(needle)))
        .map(|(code, _)| Classification::from(*code))
        .unwrap_or_else(|| Classification::from(ErrorCode::DeploymentError))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors() {
        assert_eq!(
            classify("git@github.com: Permission denied (publickey).").code,
            ErrorCode::AuthError
        );
        assert_eq!(
            classify("fatal: Authentication failed for 'https://github.com/u/r.git/'").code,
            ErrorCode::AuthError
        );
        assert_eq!(
            classify("fatal: could not read Username for 'https://github.com': terminal prompts disabled").code,
            ErrorCode::AuthError
        );
        assert_eq!(
            classify("fatal: unable to access 'https://github.com/u/r.git/': The requested URL returned error: 403").code,
            ErrorCode::AuthError
        );
    }

    #[test]
    fn test_bare_403_is_not_an_auth_error() {
        let raw = "fatal: bad object 4031c2e9a7\nerror: failed to write 1403 bytes";
        assert_ne!(classify(raw).code, ErrorCode::AuthError);
    }

    #[test]
    fn test_push_rejected() {
        let raw = "! [rejected] gh-pages -> gh-pages (fetch first)\nerror: failed to push some refs";
        assert_eq!(classify(raw).code, ErrorCode::PushRejected);
        assert_eq!(classify("merge CONFLICT in index.html").code, ErrorCode::PushRejected);
    }

    #[test]
    fn test_network_errors() {
        assert_eq!(
            classify("fatal: unable to access 'https://github.com/u/r.git/': Could not resolve host: github.com").code,
            ErrorCode::NetworkError
        );
        assert_eq!(
            classify("ssh: connect to host github.com port 22: Connection refused").code,
            ErrorCode::NetworkError
        );
    }

    #[test]
    fn test_git_errors() {
        assert_eq!(
            classify("remote: Repository not found.").code,
            ErrorCode::GitError
        );
        assert_eq!(
            classify("fatal: '/tmp/x' does not appear to be a git repository").code,
            ErrorCode::GitError
        );
    }

    #[test]
    fn test_fallback() {
        let c = classify("something novel happened");
        assert_eq!(c.code, ErrorCode::DeploymentError);
        assert_eq!(c.solution, ErrorCode::DeploymentError.solution());
    }

    #[test]
    fn test_codes_serialize_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::PushRejected).unwrap(),
            "\"PUSH_REJECTED\""
        );
        assert_eq!(serde_json::to_string(&ErrorCode::Timeout).unwrap(), "\"TIMEOUT\"");
        assert_eq!(ErrorCode::ValidationError.to_string(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_every_code_has_solution() {
        for code in [
            ErrorCode::ValidationError,
            ErrorCode::ConfigError,
            ErrorCode::BuildError,
            ErrorCode::GitError,
            ErrorCode::AuthError,
            ErrorCode::PushRejected,
            ErrorCode::NetworkError,
            ErrorCode::Timeout,
            ErrorCode::DeploymentError,
        ] {
            assert!(!code.solution().is_empty());
            assert_eq!(
                serde_json::to_string(&code).unwrap(),
                format!("\"{}\"", code.as_str())
            );
        }
    }
}
