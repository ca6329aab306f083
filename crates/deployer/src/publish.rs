use crate::error::{DeployError, PublishError};
use crate::resolve::{DeployOptions, DeploymentPlan};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Zero-byte marker that stops GitHub Pages from running Jekyll
pub const NOJEKYLL_FILE: &str = ".nojekyll";
/// Custom domain marker
pub const CNAME_FILE: &str = "CNAME";

/// Everything the publish primitive needs to push a directory to a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub branch: String,
    pub source_dir: PathBuf,
    pub message: String,
    pub remote: String,
    pub repository_url: String,
    /// Include dotfiles (the `.nojekyll` marker among them)
    pub dotfiles: bool,
    /// Add on top of the existing branch contents instead of replacing them
    pub add: bool,
    pub force: bool,
}

/// "Publish directory to branch"
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, cwd: &Path, request: &PublishRequest) -> Result<(), PublishError>;
}

pub fn default_commit_message(now: DateTime<Utc>) -> String {
    format!(
        "Deploy to GitHub Pages - {}",
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Write `.nojekyll` (if absent) and `CNAME` (if a custom domain is set)
pub fn stage_artifacts(build_dir: &Path, homepage: Option<&str>) -> Result<(), DeployError> {
    let marker = build_dir.join(NOJEKYLL_FILE);
    if !marker.exists() {
        File::create(&marker).map_err(|source| DeployError::Stage {
            path: marker.clone(),
            source,
        })?;
        debug!(path = %marker.display(), "Wrote processor-disable marker");
    }

    if let Some(domain) = homepage {
        let cname = build_dir.join(CNAME_FILE);
        fs::write(&cname, domain).map_err(|source| DeployError::Stage {
            path: cname.clone(),
            source,
        })?;
        debug!(path = %cname.display(), domain, "Wrote custom domain marker");
    }

    Ok(())
}

/// Stages publish-time artifacts and hands the build output to a [`Publisher`]
#[derive(Clone)]
pub struct PublishEngine {
    publisher: Arc<dyn Publisher>,
    timeout: Duration,
}

impl PublishEngine {
    pub fn new(publisher: Arc<dyn Publisher>, timeout: Duration) -> Self {
        Self { publisher, timeout }
    }

    pub async fn publish(
        &self,
        cwd: &Path,
        plan: &DeploymentPlan,
        options: &DeployOptions,
    ) -> Result<(), DeployError> {
        let build_dir = plan.build_path(cwd);
        if !build_dir.is_dir() {
            return Err(DeployError::Config(format!(
                "Build directory does not exist: {}. Build the site first or check --dir.",
                build_dir.display()
            )));
        }

        stage_artifacts(&build_dir, plan.homepage.as_deref())?;

        let request = PublishRequest {
            branch: plan.branch.clone(),
            source_dir: build_dir,
            message: options
                .message
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| default_commit_message(Utc::now())),
            remote: plan.remote.clone(),
            repository_url: plan.repository_url.clone(),
            dotfiles: true,
            add: true,
            force: options.force,
        };

        info!(branch = %request.branch, remote = %request.remote, force = request.force, "Publishing");
        match tokio::time::timeout(self.timeout, self.publisher.publish(cwd, &request)).await {
            Err(_) => Err(DeployError::Timeout {
                stage: "Publish",
                after: self.timeout,
            }),
            Ok(result) => result.map_err(DeployError::Publish),
        }
    }
}
