//! Deployment pipeline: validates the Git environment, resolves a plan,
//! builds the site and publishes it to a hosted-pages branch.

pub mod build;
pub mod classify;
pub mod error;
pub mod git;
pub mod lock;
pub mod pages;
pub mod pipeline;
pub mod process;
pub mod publish;
pub mod remote;
pub mod resolve;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use build::{BuildCancellation, BuildOrchestrator, SiteBuilder, clean_output_dir};
pub use classify::{Classification, ErrorCode, classify};
pub use error::{DeployError, ErrorInfo, PreflightIssue, PublishError};
pub use git::{GitRepositoryStatus, RepositoryInspector};
pub use lock::DeployLocks;
pub use pages::GitPagesPublisher;
pub use pipeline::{
    DeployConfigSummary, DeploymentPipeline, DeploymentResult, DeploymentStatus, Stage,
};
pub use process::{CommandError, CommandOutput, CommandRunner, ProcessRunner};
pub use publish::{PublishEngine, PublishRequest, Publisher};
pub use resolve::{ConfigResolver, DeployOptions, DeploymentPlan, resolve_plan};

use portfolio_kit_core::DeploySettings;
use std::time::Duration;

/// Deadlines for each kind of external work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Per git query
    pub git: Duration,
    pub build: Duration,
    /// Whole publish step, push included
    pub publish: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            git: Duration::from_secs(30),
            build: Duration::from_secs(600),
            publish: Duration::from_secs(600),
        }
    }
}

impl Timeouts {
    /// Defaults overridden by the `[deploy]` table of `portfolio.toml`
    pub fn from_settings(settings: &DeploySettings) -> Self {
        let defaults = Self::default();
        Self {
            git: settings
                .git_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.git),
            build: settings
                .build_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.build),
            publish: settings
                .publish_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.publish),
        }
    }
}
