//! Publishes to a local bare repository with the real `git` binary.
//! Skipped when git is not installed.

use async_trait::async_trait;
use portfolio_kit_deployer::{
    BuildCancellation, DeployOptions, DeploymentPipeline, ErrorCode, GitPagesPublisher,
    ProcessRunner, PublishRequest, Publisher, SiteBuilder, Timeouts,
};
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn git(cwd: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn files_on_branch(bare: &Path, branch: &str) -> Vec<String> {
    git(bare, &["ls-tree", "-r", "--name-only", branch])
        .lines()
        .map(str::to_string)
        .collect()
}

/// A bare "remote" and a project repository pointing at it
fn fixture() -> (TempDir, TempDir) {
    let remote = TempDir::new().unwrap();
    git(remote.path(), &["init", "--bare", "--quiet"]);

    let project = TempDir::new().unwrap();
    git(project.path(), &["init", "--quiet"]);
    git(
        project.path(),
        &["remote", "add", "origin", &remote.path().to_string_lossy()],
    );
    fs::write(project.path().join("projects.yaml"), "- title: Demo\n").unwrap();
    (remote, project)
}

fn request(source: &Path, message: &str) -> PublishRequest {
    PublishRequest {
        branch: "gh-pages".to_string(),
        source_dir: source.to_path_buf(),
        message: message.to_string(),
        remote: "origin".to_string(),
        repository_url: String::new(),
        dotfiles: true,
        add: true,
        force: false,
    }
}

#[tokio::test]
async fn publish_creates_branch_and_preserves_files() {
    if !git_available() {
        eprintln!("git not installed; skipping");
        return;
    }
    let (remote, project) = fixture();
    let publisher = GitPagesPublisher::new(Arc::new(ProcessRunner::for_git(Duration::from_secs(60))));

    let first = TempDir::new().unwrap();
    fs::write(first.path().join("index.html"), "v1").unwrap();
    fs::write(first.path().join(".nojekyll"), "").unwrap();
    let mut req = request(first.path(), "First deploy");
    req.repository_url = remote.path().to_string_lossy().into_owned();
    publisher.publish(project.path(), &req).await.unwrap();

    assert_eq!(
        files_on_branch(remote.path(), "gh-pages"),
        vec![".nojekyll", "index.html"]
    );

    let second = TempDir::new().unwrap();
    fs::write(second.path().join("about.html"), "about").unwrap();
    req.source_dir = second.path().to_path_buf();
    req.message = "Second deploy".to_string();
    publisher.publish(project.path(), &req).await.unwrap();

    assert_eq!(
        files_on_branch(remote.path(), "gh-pages"),
        vec![".nojekyll", "about.html", "index.html"]
    );
    let log = git(remote.path(), &["log", "--format=%s", "gh-pages"]);
    assert_eq!(log.lines().collect::<Vec<_>>(), vec!["Second deploy", "First deploy"]);

    // The project's own working tree is untouched
    assert!(!project.path().join("index.html").exists());
}

#[tokio::test]
async fn publish_to_missing_remote_is_git_error() {
    if !git_available() {
        eprintln!("git not installed; skipping");
        return;
    }
    let project = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    fs::write(source.path().join("index.html"), "v1").unwrap();
    let publisher = GitPagesPublisher::new(Arc::new(ProcessRunner::for_git(Duration::from_secs(60))));

    let mut req = request(source.path(), "Deploy");
    req.repository_url = project.path().join("missing.git").to_string_lossy().into_owned();
    let err = publisher.publish(project.path(), &req).await.unwrap_err();

    assert_eq!(err.classify().code, ErrorCode::GitError);
}

struct StaticPage;

#[async_trait]
impl SiteBuilder for StaticPage {
    async fn build(
        &self,
        _cwd: &Path,
        output_dir: &Path,
        base_url: &str,
        _cancel: &BuildCancellation,
    ) -> anyhow::Result<()> {
        fs::create_dir_all(output_dir)?;
        fs::write(
            output_dir.join("index.html"),
            format!("<base href=\"{}\">", base_url),
        )?;
        Ok(())
    }
}

#[tokio::test]
async fn pipeline_deploys_with_real_git() {
    if !git_available() {
        eprintln!("git not installed; skipping");
        return;
    }
    let (remote, project) = fixture();
    fs::write(
        project.path().join("portfolio.toml"),
        "[site]\nhomepage = \"me.example.com\"\n",
    )
    .unwrap();
    let pipeline = DeploymentPipeline::with_git(Arc::new(StaticPage), Timeouts::default());

    let status = pipeline.status(project.path(), None).await;
    assert!(status.ready, "{:?}", status.issues);

    let result = pipeline
        .deploy(project.path(), &DeployOptions::default())
        .await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.url.as_deref(), Some("https://me.example.com"));

    assert_eq!(
        files_on_branch(remote.path(), "gh-pages"),
        vec![".nojekyll", "CNAME", "index.html"]
    );
    assert_eq!(
        git(remote.path(), &["show", "gh-pages:CNAME"]),
        "me.example.com"
    );
    assert_eq!(
        git(remote.path(), &["show", "gh-pages:index.html"]),
        "<base href=\"/\">"
    );
}
