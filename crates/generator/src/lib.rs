// Static site generation for portfolio pages

pub mod template;

use anyhow::{Context, Result, bail};
use portfolio_kit_core::{SiteConfig, find_project_data, parse_projects};
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Directory copied verbatim into the build output
pub const STATIC_DIR: &str = "static";

pub struct GeneratedSite {
    pub pages: Vec<(String, String)>,   // (path, html)
    pub assets: Vec<(String, Vec<u8>)>, // (path, data)
}

/// Summary of a completed build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub projects: usize,
    pub pages: usize,
    pub static_files: usize,
}

/// Render pages for the site in memory
pub fn generate_site(
    config: &SiteConfig,
    projects: &[portfolio_kit_core::Project],
    base_url: &str,
) -> GeneratedSite {
    GeneratedSite {
        pages: vec![(
            "index.html".to_string(),
            template::generate_index_html(&config.site, projects, base_url),
        )],
        assets: vec![(
            "style.css".to_string(),
            template::generate_stylesheet().as_bytes().to_vec(),
        )],
    }
}

/// Build the site for `project_dir` into `output_dir`.
///
/// Loads `portfolio.toml` and the project data file, renders pages and
/// copies the `static/` directory. Errors describe the failing input so
/// they can be shown to the user as-is.
pub fn build_site(project_dir: &Path, output_dir: &Path, base_url: &str) -> Result<BuildSummary> {
    build_site_until(project_dir, output_dir, base_url, || false)
}

/// [`build_site`], checking `cancelled` before every write.
///
/// Returns an error as soon as `cancelled` reports true; nothing is written
/// to `output_dir` after that.
pub fn build_site_until(
    project_dir: &Path,
    output_dir: &Path,
    base_url: &str,
    cancelled: impl Fn() -> bool,
) -> Result<BuildSummary> {
    let config = portfolio_kit_core::load_site_config(project_dir)
        .context("Failed to load portfolio.toml")?;
    let data_file = find_project_data(project_dir).with_context(|| {
        format!(
            "No projects file found in {} (expected projects.yaml, projects.yml, projects.json or projects.toml)",
            project_dir.display()
        )
    })?;
    let projects = parse_projects(&data_file)?;
    debug!(count = projects.len(), file = %data_file.path.display(), "Loaded project data");

    ensure_running(&cancelled)?;
    fs::create_dir_all(output_dir).context("Failed to create output directory")?;

    let site = generate_site(&config, &projects, base_url);
    for (path, html) in &site.pages {
        ensure_running(&cancelled)?;
        fs::write(output_dir.join(path), html)
            .with_context(|| format!("Failed to write {}", path))?;
    }

    let static_src = project_dir.join(STATIC_DIR);
    let static_files = if static_src.is_dir() {
        copy_tree(&static_src, &output_dir.join(STATIC_DIR), &cancelled)?
    } else {
        0
    };

    for (path, data) in &site.assets {
        ensure_running(&cancelled)?;
        fs::write(output_dir.join(path), data)
            .with_context(|| format!("Failed to write {}", path))?;
    }

    Ok(BuildSummary {
        projects: projects.len(),
        pages: site.pages.len(),
        static_files,
    })
}

fn ensure_running(cancelled: &impl Fn() -> bool) -> Result<()> {
    if cancelled() {
        bail!("Build cancelled");
    }
    Ok(())
}

/// Copy every file under `src` into `dst`, returning the number of files copied
fn copy_tree(src: &Path, dst: &Path, cancelled: &impl Fn() -> bool) -> Result<usize> {
    let mut copied = 0;
    for entry in WalkDir::new(src) {
        ensure_running(cancelled)?;
        let entry = entry.with_context(|| format!("Failed to read {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .context("Failed to get relative path")?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target)
                .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}
