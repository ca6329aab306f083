pub mod build;
pub mod deploy;
pub mod serve;
pub mod status;

use crate::builder::StaticSiteBuilder;
use anyhow::{Context, Result};
use portfolio_kit_core::load_site_config;
use portfolio_kit_deployer::{DeploymentPipeline, Timeouts};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Absolute path of an existing project directory
pub fn project_dir(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        anyhow::bail!("Project directory does not exist: {}", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))
}

/// Deadlines from `[deploy]` in portfolio.toml.
///
/// A malformed file falls back to the defaults here; the pipeline reports it
/// properly when it resolves the configuration.
pub fn timeouts_for(project: &Path) -> Timeouts {
    match load_site_config(project) {
        Ok(config) => Timeouts::from_settings(&config.deploy),
        Err(e) => {
            warn!(error = %e, "Could not read timeouts from portfolio.toml");
            Timeouts::default()
        }
    }
}

/// Pipeline using the real git binary and the in-process site generator
pub fn pipeline_for(project: &Path) -> DeploymentPipeline {
    DeploymentPipeline::with_git(Arc::new(StaticSiteBuilder), timeouts_for(project))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_project_dir_must_exist() {
        let dir = TempDir::new().unwrap();
        assert!(project_dir(&dir.path().join("missing")).is_err());
        assert!(project_dir(dir.path()).unwrap().is_absolute());
    }

    #[test]
    fn test_timeouts_from_config() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("portfolio.toml"),
            "[deploy]\nbuild_timeout_secs = 42\n",
        )
        .unwrap();
        assert_eq!(timeouts_for(dir.path()).build, Duration::from_secs(42));

        fs::write(dir.path().join("portfolio.toml"), "[deploy\n").unwrap();
        assert_eq!(timeouts_for(dir.path()), Timeouts::default());
    }
}
