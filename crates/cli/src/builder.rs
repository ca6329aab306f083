use anyhow::Context;
use async_trait::async_trait;
use portfolio_kit_deployer::{BuildCancellation, SiteBuilder};
use std::path::Path;
use tracing::info;

/// [`SiteBuilder`] backed by the in-process generator
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticSiteBuilder;

#[async_trait]
impl SiteBuilder for StaticSiteBuilder {
    async fn build(
        &self,
        cwd: &Path,
        output_dir: &Path,
        base_url: &str,
        cancel: &BuildCancellation,
    ) -> anyhow::Result<()> {
        let project = cwd.to_path_buf();
        let output = output_dir.to_path_buf();
        let base_url = base_url.to_string();
        let cancel = cancel.clone();

        let summary = tokio::task::spawn_blocking(move || {
            portfolio_kit_generator::build_site_until(&project, &output, &base_url, || {
                cancel.is_cancelled()
            })
        })
        .await
        .context("Site generator task failed")??;

        info!(
            projects = summary.projects,
            pages = summary.pages,
            static_files = summary.static_files,
            "Site generated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_builds_into_output_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("projects.yaml"),
            "- title: Compiler\n  description: A *tiny* compiler\n",
        )
        .unwrap();
        let out = dir.path().join("dist");

        StaticSiteBuilder
            .build(dir.path(), &out, "/r/", &BuildCancellation::new())
            .await
            .unwrap();

        let html = fs::read_to_string(out.join("index.html")).unwrap();
        assert!(html.contains("Compiler"));
        assert!(html.contains("/r/"));
    }

    #[tokio::test]
    async fn test_invalid_project_data_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("projects.json"), "{ not json").unwrap();

        let err = StaticSiteBuilder
            .build(
                dir.path(),
                &dir.path().join("dist"),
                "/",
                &BuildCancellation::new(),
            )
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("projects.json"));
    }

    #[tokio::test]
    async fn test_cancelled_build_leaves_output_untouched() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("projects.yaml"), "- title: Compiler\n").unwrap();
        let out = dir.path().join("dist");
        let cancel = BuildCancellation::new();
        cancel.cancel();

        let err = StaticSiteBuilder
            .build(dir.path(), &out, "/", &cancel)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Build cancelled"));
        assert!(!out.exists());
    }
}
