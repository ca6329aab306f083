use anyhow::Result;
use portfolio_kit_deployer::remote::redact_credentials;
use portfolio_kit_deployer::{DeployOptions, DeploymentResult, Stage};
use std::path::PathBuf;

fn stage_icon(stage: Stage) -> &'static str {
    match stage {
        Stage::CheckGitInstalled | Stage::ValidateRepository => "🔍",
        Stage::LocateProjectData => "📄",
        Stage::ResolveConfig => "⚙️ ",
        Stage::Build => "🔨",
        Stage::Publish => "📤",
    }
}

/// Build and publish the site to a GitHub Pages branch
pub async fn run(path: PathBuf, options: DeployOptions) -> Result<()> {
    let project = super::project_dir(&path)?;

    println!("🚀 Deploying portfolio to GitHub Pages...");
    println!("   Project: {}", project.display());
    if options.dry_run {
        println!("   Dry run: nothing will be built or published");
    }
    println!();

    let pipeline = super::pipeline_for(&project);
    let result = pipeline
        .deploy_with_progress(&project, &options, |stage| {
            println!("{} {}...", stage_icon(stage), stage);
        })
        .await;

    println!();
    if result.success {
        println!("{}", format_result(&result));
        Ok(())
    } else {
        eprintln!("{}", format_result(&result));
        let code = result
            .error
            .as_ref()
            .map(|e| e.code.as_str())
            .unwrap_or("DEPLOYMENT_ERROR");
        anyhow::bail!("Deployment failed ({})", code)
    }
}

/// Human-readable report of a finished deployment
pub fn format_result(result: &DeploymentResult) -> String {
    let mut lines = Vec::new();
    let seconds = result.duration_ms as f64 / 1000.0;

    if result.success {
        match &result.plan {
            Some(plan) if result.dry_run => {
                lines.push("✅ Dry run complete".to_string());
                lines.push(format!(
                    "   Repository: {}",
                    redact_credentials(&plan.repository_url)
                ));
                lines.push(format!("   Remote: {}", plan.remote));
                lines.push(format!("   Branch: {}", plan.branch));
                lines.push(format!("   Build dir: {}", plan.build_dir.display()));
                lines.push(format!("   Base URL: {}", plan.base_url));
                if let Some(homepage) = &plan.homepage {
                    lines.push(format!("   Custom domain: {}", homepage));
                }
                lines.push(format!("   Would be live at: {}", plan.url));
            }
            _ => {
                lines.push("✅ Deployment complete!".to_string());
                if let Some(url) = &result.url {
                    lines.push(format!("   URL: {}", url));
                }
                if let Some(branch) = &result.branch {
                    lines.push(format!("   Branch: {}", branch));
                }
                lines.push(String::new());
                lines.push("   GitHub Pages can take a minute or two to update.".to_string());
            }
        }
    } else {
        lines.push(format!("❌ {}", result.message));
        if let Some(error) = &result.error {
            lines.push(format!("   Code: {}", error.code));
            if let Some(details) = &error.details {
                lines.push(format!("   Details: {}", details));
            }
            if let Some(solution) = &error.solution {
                lines.push(String::new());
                lines.push(format!("💡 {}", solution));
            }
        }
    }

    lines.push(format!("   Took {:.1}s", seconds));
    lines.join("\n")
}
