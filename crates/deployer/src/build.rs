use crate::error::DeployError;
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Shared flag a [`SiteBuilder`] polls between writes to the output directory
#[derive(Debug, Clone, Default)]
pub struct BuildCancellation(Arc<AtomicBool>);

impl BuildCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The site generator, seen from the deployer as an opaque step.
///
/// Once `cancel` is set the builder must stop writing to `output_dir` and
/// return; the orchestrator waits for that before reporting a timeout.
#[async_trait]
pub trait SiteBuilder: Send + Sync {
    async fn build(
        &self,
        cwd: &Path,
        output_dir: &Path,
        base_url: &str,
        cancel: &BuildCancellation,
    ) -> anyhow::Result<()>;
}

/// Runs the build step with an optional clean and a deadline
#[derive(Clone)]
pub struct BuildOrchestrator {
    builder: Arc<dyn SiteBuilder>,
    timeout: Duration,
}

impl BuildOrchestrator {
    pub fn new(builder: Arc<dyn SiteBuilder>, timeout: Duration) -> Self {
        Self { builder, timeout }
    }

    pub async fn build(
        &self,
        cwd: &Path,
        output_dir: &Path,
        base_url: &str,
        clean: bool,
    ) -> Result<(), DeployError> {
        if clean {
            clean_output_dir(cwd, output_dir)?;
        }

        info!(output = %output_dir.display(), base_url, "Building site");
        let cancel = BuildCancellation::new();
        let mut build = std::pin::pin!(self.builder.build(cwd, output_dir, base_url, &cancel));
        match tokio::time::timeout(self.timeout, &mut build).await {
            Err(_) => {
                // The output directory is only handed back once the builder has stopped.
                cancel.cancel();
                warn!(after = ?self.timeout, "Build timed out, waiting for the builder to stop");
                if let Err(e) = build.await {
                    debug!(error = %format!("{:#}", e), "Cancelled build returned an error");
                }
                Err(DeployError::Timeout {
                    stage: "Build",
                    after: self.timeout,
                })
            }
            Ok(Err(e)) => Err(DeployError::Build(format!("{:#}", e))),
            Ok(Ok(())) => Ok(()),
        }
    }
}

/// Remove the contents of `output_dir`, keeping the directory itself.
///
/// Refuses to touch the project directory or any of its ancestors.
pub fn clean_output_dir(cwd: &Path, output_dir: &Path) -> Result<(), DeployError> {
    if !output_dir.exists() {
        return Ok(());
    }

    let clean_error = |e: std::io::Error| {
        DeployError::Build(format!(
            "Failed to clean output directory {}: {}",
            output_dir.display(),
            e
        ))
    };

    let output = output_dir.canonicalize().map_err(clean_error)?;
    let project = cwd.canonicalize().map_err(clean_error)?;
    if project.starts_with(&output) {
        return Err(DeployError::Build(format!(
            "Refusing to clean {}: it contains the project directory",
            output_dir.display()
        )));
    }
    if !output.is_dir() {
        return Err(DeployError::Build(format!(
            "Output path {} exists and is not a directory",
            output_dir.display()
        )));
    }

    debug!(output = %output.display(), "Cleaning output directory");
    for entry in fs::read_dir(&output).map_err(clean_error)? {
        let path = entry.map_err(clean_error)?.path();
        if path.is_dir() && !path.is_symlink() {
            fs::remove_dir_all(&path).map_err(clean_error)?;
        } else {
            fs::remove_file(&path).map_err(clean_error)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorCode;
    use crate::testing::FakeBuilder;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_build_passes_output_and_base_url() {
        let dir = TempDir::new().unwrap();
        let builder = Arc::new(FakeBuilder::new());
        let orchestrator = BuildOrchestrator::new(builder.clone(), Duration::from_secs(5));
        let out = dir.path().join("dist");

        orchestrator
            .build(dir.path(), &out, "/r/", true)
            .await
            .unwrap();

        assert_eq!(
            builder.calls(),
            vec![(dir.path().to_path_buf(), out.clone(), "/r/".to_string())]
        );
        assert!(out.join("index.html").exists());
    }

    #[tokio::test]
    async fn test_build_failure_is_verbatim() {
        let dir = TempDir::new().unwrap();
        let builder = Arc::new(FakeBuilder::failing("projects.yaml: project #2 has an empty title"));
        let orchestrator = BuildOrchestrator::new(builder, Duration::from_secs(5));

        let err = orchestrator
            .build(dir.path(), &dir.path().join("dist"), "/", false)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BuildError);
        assert_eq!(
            err.to_info().details.as_deref(),
            Some("projects.yaml: project #2 has an empty title")
        );
    }

    #[tokio::test]
    async fn test_build_timeout() {
        let dir = TempDir::new().unwrap();
        let builder = Arc::new(FakeBuilder::slow(Duration::from_secs(5)));
        let orchestrator = BuildOrchestrator::new(builder, Duration::from_millis(50));

        let err = orchestrator
            .build(dir.path(), &dir.path().join("dist"), "/", false)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Timeout);
    }

    /// Generator on the blocking pool that ignores cancellation and writes late
    struct LateWriter {
        delay: Duration,
    }

    #[async_trait]
    impl SiteBuilder for LateWriter {
        async fn build(
            &self,
            _cwd: &Path,
            output_dir: &Path,
            _base_url: &str,
            _cancel: &BuildCancellation,
        ) -> anyhow::Result<()> {
            let output = output_dir.to_path_buf();
            let delay = self.delay;
            tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
                std::thread::sleep(delay);
                fs::create_dir_all(&output)?;
                fs::write(output.join("late.html"), "late")?;
                Ok(())
            })
            .await?
        }
    }

    /// Writes one page per tick until cancelled
    struct PageWriter;

    #[async_trait]
    impl SiteBuilder for PageWriter {
        async fn build(
            &self,
            _cwd: &Path,
            output_dir: &Path,
            _base_url: &str,
            cancel: &BuildCancellation,
        ) -> anyhow::Result<()> {
            let output = output_dir.to_path_buf();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
                fs::create_dir_all(&output)?;
                let mut page = 0;
                while !cancel.is_cancelled() {
                    fs::write(output.join(format!("page-{}.html", page)), "page")?;
                    page += 1;
                    std::thread::sleep(Duration::from_millis(10));
                }
                anyhow::bail!("Build cancelled")
            })
            .await?
        }
    }

    #[tokio::test]
    async fn test_timeout_waits_for_blocking_build_to_finish() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("dist");
        let orchestrator = BuildOrchestrator::new(
            Arc::new(LateWriter {
                delay: Duration::from_millis(300),
            }),
            Duration::from_millis(50),
        );

        let err = orchestrator
            .build(dir.path(), &out, "/", false)
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::Timeout);
        assert!(out.join("late.html").exists());
    }

    #[tokio::test]
    async fn test_timeout_cancels_cooperative_build() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("dist");
        let orchestrator = BuildOrchestrator::new(Arc::new(PageWriter), Duration::from_millis(50));

        let err = orchestrator
            .build(dir.path(), &out, "/", false)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Timeout);

        let written = fs::read_dir(&out).unwrap().count();
        assert!(written > 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fs::read_dir(&out).unwrap().count(), written);
    }

    #[test]
    fn test_clean_removes_contents_only() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("dist");
        fs::create_dir_all(out.join("nested")).unwrap();
        fs::write(out.join("old.html"), "old").unwrap();
        fs::write(out.join("nested/a.css"), "a").unwrap();
        fs::write(dir.path().join("keep.txt"), "keep").unwrap();

        clean_output_dir(dir.path(), &out).unwrap();

        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
        assert!(dir.path().join("keep.txt").exists());
    }

    #[test]
    fn test_clean_missing_dir_is_noop() {
        let dir = TempDir::new().unwrap();
        clean_output_dir(dir.path(), &dir.path().join("dist")).unwrap();
    }

    #[test]
    fn test_clean_refuses_project_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("projects.yaml"), "[]").unwrap();

        let err = clean_output_dir(dir.path(), dir.path()).unwrap_err();
        assert!(err.to_string().contains("contains the project directory"));
        assert!(dir.path().join("projects.yaml").exists());

        let parent = dir.path().join("..");
        assert!(clean_output_dir(dir.path(), &parent).is_err());
    }

    #[test]
    fn test_clean_rejects_file_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("dist");
        fs::write(&out, "not a dir").unwrap();
        let err = clean_output_dir(dir.path(), &out).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BuildError);
    }
}
