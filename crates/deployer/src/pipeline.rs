//! The deployment state machine shared by the CLI and the HTTP API.
//!
//! `CheckGitInstalled → ValidateRepository → LocateProjectData →
//! ResolveConfig → [dry run: stop] → Build → Publish`. Every stage is a hard
//! gate; the first failure ends the run with that stage's error.

use crate::build::{BuildOrchestrator, SiteBuilder};
use crate::error::{DeployError, ErrorInfo, PreflightIssue};
use crate::git::RepositoryInspector;
use crate::pages::GitPagesPublisher;
use crate::process::{CommandRunner, ProcessRunner};
use crate::remote::redact_credentials;
use crate::publish::{PublishEngine, Publisher};
use crate::resolve::{ConfigResolver, DeployOptions, DeploymentPlan};
use crate::Timeouts;
use portfolio_kit_core::find_project_data;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    CheckGitInstalled,
    ValidateRepository,
    LocateProjectData,
    ResolveConfig,
    Build,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::CheckGitInstalled => "Checking Git installation",
            Stage::ValidateRepository => "Validating repository",
            Stage::LocateProjectData => "Locating project data",
            Stage::ResolveConfig => "Resolving configuration",
            Stage::Build => "Building site",
            Stage::Publish => "Publishing",
        };
        f.write_str(label)
    }
}

/// Outcome of one deployment attempt.
///
/// `url` is set on success, `error` on failure, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<DeploymentPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfigSummary {
    pub branch: String,
    pub base_url: String,
    pub homepage: Option<String>,
    pub build_dir: PathBuf,
}

impl From<DeploymentPlan> for DeployConfigSummary {
    fn from(plan: DeploymentPlan) -> Self {
        Self {
            branch: plan.branch,
            base_url: plan.base_url,
            homepage: plan.homepage,
            build_dir: plan.build_dir,
        }
    }
}

/// Readiness report: every pre-flight gate, evaluated without stopping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    pub ready: bool,
    pub git_installed: bool,
    pub is_git_repo: bool,
    pub has_remote: bool,
    pub remote_name: String,
    pub remote_url: String,
    pub current_branch: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy_config: Option<DeployConfigSummary>,
}

#[derive(Clone)]
pub struct DeploymentPipeline {
    inspector: RepositoryInspector,
    resolver: ConfigResolver,
    build: BuildOrchestrator,
    publish: PublishEngine,
}

impl DeploymentPipeline {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        builder: Arc<dyn SiteBuilder>,
        publisher: Arc<dyn Publisher>,
        timeouts: Timeouts,
    ) -> Self {
        let inspector = RepositoryInspector::new(runner);
        Self {
            resolver: ConfigResolver::new(inspector.clone()),
            inspector,
            build: BuildOrchestrator::new(builder, timeouts.build),
            publish: PublishEngine::new(publisher, timeouts.publish),
        }
    }

    /// Pipeline wired to the real `git` binary
    pub fn with_git(builder: Arc<dyn SiteBuilder>, timeouts: Timeouts) -> Self {
        let queries = Arc::new(ProcessRunner::for_git(timeouts.git));
        let publisher = Arc::new(GitPagesPublisher::new(Arc::new(ProcessRunner::for_git(
            timeouts.publish,
        ))));
        Self::new(queries, builder, publisher, timeouts)
    }

    pub async fn deploy(&self, cwd: &Path, options: &DeployOptions) -> DeploymentResult {
        self.deploy_with_progress(cwd, options, |_| {}).await
    }

    /// Run a deployment, reporting each stage as it is entered
    pub async fn deploy_with_progress<F>(
        &self,
        cwd: &Path,
        options: &DeployOptions,
        mut progress: F,
    ) -> DeploymentResult
    where
        F: FnMut(Stage) + Send,
    {
        let started = Instant::now();
        let outcome = self.run(cwd, options, &mut progress).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(plan) => {
                let message = if options.dry_run {
                    format!(
                        "Dry run complete: would deploy branch '{}' to {}",
                        plan.branch, plan.url
                    )
                } else {
                    format!("Deployed to {}", plan.url)
                };
                info!(url = %plan.url, branch = %plan.branch, duration_ms, dry_run = options.dry_run, "{}", message);
                DeploymentResult {
                    success: true,
                    message,
                    url: Some(plan.url.clone()),
                    branch: Some(plan.branch.clone()),
                    duration_ms,
                    dry_run: options.dry_run,
                    error: None,
                    plan: Some(plan),
                }
            }
            Err(e) => {
                let info = e.to_info();
                warn!(code = %info.code, error = %e, duration_ms, "Deployment failed");
                DeploymentResult {
                    success: false,
                    message: info.message.clone(),
                    url: None,
                    branch: None,
                    duration_ms,
                    dry_run: options.dry_run,
                    error: Some(info),
                    plan: None,
                }
            }
        }
    }

    async fn run<F>(
        &self,
        cwd: &Path,
        options: &DeployOptions,
        progress: &mut F,
    ) -> Result<DeploymentPlan, DeployError>
    where
        F: FnMut(Stage) + Send,
    {
        progress(Stage::CheckGitInstalled);
        if !self.inspector.is_installed(cwd).await? {
            return Err(DeployError::Preflight(PreflightIssue::GitNotInstalled));
        }

        progress(Stage::ValidateRepository);
        let remote = options.remote_name();
        let repo = self.inspector.validate(cwd, remote).await?;
        if !repo.is_git_repo {
            return Err(DeployError::Preflight(PreflightIssue::NotARepository));
        }
        if !repo.has_remote {
            return Err(DeployError::Preflight(PreflightIssue::NoRemote {
                remote: remote.to_string(),
            }));
        }

        progress(Stage::LocateProjectData);
        let data = find_project_data(cwd)
            .ok_or(DeployError::Preflight(PreflightIssue::NoProjectData))?;
        debug!(file = %data.path.display(), format = %data.format, "Found project data");

        progress(Stage::ResolveConfig);
        let plan = self.resolver.resolve(cwd, options).await?;
        if options.dry_run {
            return Ok(plan);
        }

        if options.no_build {
            info!("Skipping build");
        } else {
            progress(Stage::Build);
            self.build
                .build(cwd, &plan.build_path(cwd), &plan.base_url, true)
                .await?;
        }

        progress(Stage::Publish);
        self.publish.publish(cwd, &plan, options).await?;
        Ok(plan)
    }

    /// Evaluate every pre-flight gate for `cwd` and the given remote
    pub async fn status(&self, cwd: &Path, remote: Option<&str>) -> DeploymentStatus {
        let options = DeployOptions {
            remote: remote.map(str::to_string),
            ..Default::default()
        };
        let mut status = DeploymentStatus {
            remote_name: options.remote_name().to_string(),
            ..Default::default()
        };

        match self.inspector.is_installed(cwd).await {
            Ok(true) => status.git_installed = true,
            Ok(false) => {
                status
                    .issues
                    .push(PreflightIssue::GitNotInstalled.message().to_string());
                return status;
            }
            Err(e) => {
                status.issues.push(DeployError::Git(e).to_string());
                return status;
            }
        }

        match self.inspector.validate(cwd, &status.remote_name).await {
            Ok(repo) => {
                status.is_git_repo = repo.is_git_repo;
                status.has_remote = repo.has_remote;
                status.remote_url = redact_credentials(&repo.remote_url);
                status.current_branch = repo.current_branch;
                if !repo.is_git_repo {
                    status
                        .issues
                        .push(PreflightIssue::NotARepository.message().to_string());
                } else if !repo.has_remote {
                    let issue = PreflightIssue::NoRemote {
                        remote: status.remote_name.clone(),
                    };
                    status.issues.push(issue.message().to_string());
                }
            }
            Err(e) => status.issues.push(DeployError::Git(e).to_string()),
        }

        if find_project_data(cwd).is_none() {
            status
                .issues
                .push(PreflightIssue::NoProjectData.message().to_string());
        }

        if status.has_remote {
            match self.resolver.resolve(cwd, &options).await {
                Ok(plan) => status.deploy_config = Some(plan.into()),
                Err(e) => status.issues.push(e.to_string()),
            }
        }

        status.ready = status.issues.is_empty();
        status
    }
}
