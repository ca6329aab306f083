use anyhow::{Context, Result};
use portfolio_kit_deployer::DeploymentStatus;
use std::path::PathBuf;

fn check(ok: bool) -> &'static str {
    if ok { "✓" } else { "✗" }
}

/// Show whether the project is ready to deploy
pub async fn run(path: PathBuf, remote: String, json: bool) -> Result<()> {
    let project = super::project_dir(&path)?;
    let pipeline = super::pipeline_for(&project);
    let status = pipeline.status(&project, Some(&remote)).await;

    if json {
        let body = serde_json::to_string_pretty(&status).context("Failed to serialize status")?;
        println!("{}", body);
    } else {
        println!("{}", format_status(&status));
    }
    Ok(())
}

pub fn format_status(status: &DeploymentStatus) -> String {
    let mut lines = vec![
        "📋 Deployment status".to_string(),
        format!("   {} Git installed", check(status.git_installed)),
        format!("   {} Git repository", check(status.is_git_repo)),
    ];

    if status.has_remote {
        lines.push(format!(
            "   ✓ Remote '{}': {}",
            status.remote_name, status.remote_url
        ));
    } else {
        lines.push(format!("   ✗ Remote '{}'", status.remote_name));
    }
    if !status.current_branch.is_empty() {
        lines.push(format!("   Current branch: {}", status.current_branch));
    }

    if let Some(config) = &status.deploy_config {
        lines.push(String::new());
        lines.push("⚙️  Deployment".to_string());
        lines.push(format!("   Branch: {}", config.branch));
        lines.push(format!("   Build dir: {}", config.build_dir.display()));
        lines.push(format!("   Base URL: {}", config.base_url));
        if let Some(homepage) = &config.homepage {
            lines.push(format!("   Custom domain: {}", homepage));
        }
    }

    lines.push(String::new());
    if status.ready {
        lines.push("✅ Ready to deploy".to_string());
    } else {
        lines.push("⚠️  Not ready to deploy:".to_string());
        for issue in &status.issues {
            lines.push(format!("   • {}", issue));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use portfolio_kit_deployer::DeployConfigSummary;

    #[test]
    fn test_ready_report() {
        let status = DeploymentStatus {
            ready: true,
            git_installed: true,
            is_git_repo: true,
            has_remote: true,
            remote_name: "origin".to_string(),
            remote_url: "https://github.com/u/r.git".to_string(),
            current_branch: "main".to_string(),
            issues: vec![],
            deploy_config: Some(DeployConfigSummary {
                branch: "gh-pages".to_string(),
                base_url: "/r/".to_string(),
                homepage: None,
                build_dir: PathBuf::from("dist"),
            }),
        };

        let report = format_status(&status);
        assert!(report.contains("✓ Remote 'origin': https://github.com/u/r.git"));
        assert!(report.contains("Base URL: /r/"));
        assert!(report.ends_with("✅ Ready to deploy"));
    }

    #[test]
    fn test_issues_are_listed() {
        let status = DeploymentStatus {
            git_installed: true,
            remote_name: "origin".to_string(),
            issues: vec![
                "Not a Git repository".to_string(),
                "No projects file found".to_string(),
            ],
            ..Default::default()
        };

        let report = format_status(&status);
        assert!(report.contains("✗ Git repository"));
        assert!(report.contains("• Not a Git repository"));
        assert!(report.contains("• No projects file found"));
        assert!(!report.contains("Ready to deploy\n"));
    }
}
