use anyhow::{Context, Result};
use portfolio_kit_core::{TRIVIAL_BASE_URL, load_site_config};
use portfolio_kit_deployer::clean_output_dir;
use portfolio_kit_deployer::resolve::DEFAULT_BUILD_DIR;
use std::path::PathBuf;

/// Build the static site without deploying
pub async fn run(path: PathBuf, output: Option<PathBuf>, base_url: Option<String>) -> Result<()> {
    let project = super::project_dir(&path)?;
    let config = load_site_config(&project).context("Failed to load portfolio.toml")?;

    let output = project.join(
        output
            .or_else(|| config.site.output.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR)),
    );
    let base_url = base_url
        .or_else(|| config.site.base_url.clone())
        .unwrap_or_else(|| TRIVIAL_BASE_URL.to_string());

    println!("🔨 Building portfolio site...");
    println!("   Source: {}", project.display());
    println!("   Output: {}", output.display());
    println!("   Base URL: {}", base_url);
    println!();

    clean_output_dir(&project, &output)?;

    let build_project = project.clone();
    let build_output = output.clone();
    let summary = tokio::task::spawn_blocking(move || {
        portfolio_kit_generator::build_site(&build_project, &build_output, &base_url)
    })
    .await
    .context("Site generator task failed")??;

    println!("   ✓ Rendered {} projects", summary.projects);
    println!("   ✓ Wrote {} pages", summary.pages);
    println!("   ✓ Copied {} static files", summary.static_files);
    println!();
    println!("✅ Build complete!");
    println!("   Output: {}", output.display());
    println!();
    println!("To preview locally:");
    println!("   portfolio-kit -C {} serve", project.display());
    println!();

    Ok(())
}
