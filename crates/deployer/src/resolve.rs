//! Resolution of CLI/API options, `portfolio.toml` and the Git remote into
//! one concrete [`DeploymentPlan`].

use crate::error::DeployError;
use crate::git::RepositoryInspector;
use crate::remote::{deployment_url, parse_remote};
use portfolio_kit_core::{SiteConfig, load_site_config};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_BRANCH: &str = "gh-pages";
pub const DEFAULT_BUILD_DIR: &str = "dist";
pub const DEFAULT_REMOTE: &str = "origin";

/// Caller-supplied deployment options; unset fields fall through to
/// configuration and defaults during resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOptions {
    pub branch: Option<String>,
    pub message: Option<String>,
    pub remote: Option<String>,
    pub build_dir: Option<PathBuf>,
    pub no_build: bool,
    pub dry_run: bool,
    pub force: bool,
}

impl DeployOptions {
    pub fn remote_name(&self) -> &str {
        self.remote
            .as_deref()
            .filter(|remote| !remote.trim().is_empty())
            .unwrap_or(DEFAULT_REMOTE)
    }
}

/// Fully resolved parameters of one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPlan {
    #[serde(serialize_with = "crate::remote::serialize_redacted")]
    pub repository_url: String,
    pub homepage: Option<String>,
    pub base_url: String,
    pub branch: String,
    /// Relative to the project directory unless absolute
    pub build_dir: PathBuf,
    pub remote: String,
    /// Where the site will be served once published
    pub url: String,
}

impl DeploymentPlan {
    /// Build directory joined onto the project directory
    pub fn build_path(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.build_dir)
    }
}

/// Merge options, configuration and the remote URL.
///
/// Precedence: explicit option, then `portfolio.toml`, then values derived
/// from the remote, then hard defaults.
pub fn resolve_plan(
    config: &SiteConfig,
    options: &DeployOptions,
    remote_url: Option<&str>,
) -> Result<DeploymentPlan, DeployError> {
    let remote = options.remote_name().to_string();
    let repository_url = remote_url
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            DeployError::Config(format!(
                "Git remote '{}' has no URL; cannot determine where to publish",
                remote
            ))
        })?
        .to_string();

    let branch = options
        .branch
        .as_deref()
        .or(config.deploy.branch.as_deref())
        .map(str::trim)
        .filter(|branch| !branch.is_empty())
        .unwrap_or(DEFAULT_BRANCH)
        .to_string();

    let build_dir = options
        .build_dir
        .clone()
        .or_else(|| config.site.output.clone())
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR));

    let homepage = config.site.custom_domain().map(str::to_string);
    let parsed = parse_remote(&repository_url);

    let base_url = match config.site.explicit_base_url() {
        Some(explicit) => explicit.to_string(),
        None if homepage.is_some() => "/".to_string(),
        None => parsed
            .as_ref()
            .map(|remote| remote.pages_base_url())
            .unwrap_or_else(|| "/".to_string()),
    };

    let url = match &homepage {
        Some(domain) => format!("https://{}", domain),
        None => deployment_url(&repository_url),
    };

    Ok(DeploymentPlan {
        repository_url,
        homepage,
        base_url,
        branch,
        build_dir,
        remote,
        url,
    })
}

/// Resolves plans for a project directory
#[derive(Clone)]
pub struct ConfigResolver {
    inspector: RepositoryInspector,
}

impl ConfigResolver {
    pub fn new(inspector: RepositoryInspector) -> Self {
        Self { inspector }
    }

    pub async fn resolve(
        &self,
        cwd: &Path,
        options: &DeployOptions,
    ) -> Result<DeploymentPlan, DeployError> {
        let config = load_site_config(cwd).map_err(|e| DeployError::Config(e.to_string()))?;
        let remote_url = self
            .inspector
            .get_remote_url(cwd, options.remote_name())
            .await?;
        let plan = resolve_plan(&config, options, remote_url.as_deref())?;
        debug!(
            branch = %plan.branch,
            base_url = %plan.base_url,
            build_dir = %plan.build_dir.display(),
            url = %plan.url,
            "Resolved deployment plan"
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGit;
    use portfolio_kit_core::config::parse_site_config_str;
    use std::sync::Arc;
    use tempfile::TempDir;

    const URL: &str = "https://github.com/u/r.git";

    fn config(toml: &str) -> SiteConfig {
        parse_site_config_str(toml).unwrap()
    }

    #[test]
    fn test_defaults_from_github_remote() {
        let plan = resolve_plan(&SiteConfig::default(), &DeployOptions::default(), Some(URL)).unwrap();
        assert_eq!(plan.branch, "gh-pages");
        assert_eq!(plan.build_dir, PathBuf::from("dist"));
        assert_eq!(plan.base_url, "/r/");
        assert_eq!(plan.remote, "origin");
        assert_eq!(plan.url, "https://u.github.io/r");
        assert_eq!(plan.homepage, None);
        assert_eq!(plan.repository_url, URL);
    }

    #[test]
    fn test_branch_precedence() {
        let file = config("[deploy]\nbranch = \"from-config\"\n");
        let cli = DeployOptions {
            branch: Some("from-cli".to_string()),
            ..Default::default()
        };

        assert_eq!(resolve_plan(&file, &cli, Some(URL)).unwrap().branch, "from-cli");
        assert_eq!(
            resolve_plan(&file, &DeployOptions::default(), Some(URL)).unwrap().branch,
            "from-config"
        );
        assert_eq!(
            resolve_plan(&SiteConfig::default(), &DeployOptions::default(), Some(URL))
                .unwrap()
                .branch,
            "gh-pages"
        );
    }

    #[test]
    fn test_build_dir_precedence() {
        let file = config("[site]\noutput = \"public\"\n");
        let cli = DeployOptions {
            build_dir: Some(PathBuf::from("out")),
            ..Default::default()
        };

        assert_eq!(
            resolve_plan(&file, &cli, Some(URL)).unwrap().build_dir,
            PathBuf::from("out")
        );
        assert_eq!(
            resolve_plan(&file, &DeployOptions::default(), Some(URL))
                .unwrap()
                .build_dir,
            PathBuf::from("public")
        );
    }

    #[test]
    fn test_explicit_base_url_is_never_overridden() {
        let file = config("[site]\nbase_url = \"/custom/\"\n");
        let plan = resolve_plan(&file, &DeployOptions::default(), Some(URL)).unwrap();
        assert_eq!(plan.base_url, "/custom/");
    }

    #[test]
    fn test_trivial_base_url_is_derived() {
        let file = config("[site]\nbase_url = \"./\"\n");
        let plan = resolve_plan(&file, &DeployOptions::default(), Some(URL)).unwrap();
        assert_eq!(plan.base_url, "/r/");
    }

    #[test]
    fn test_homepage_serves_from_root() {
        let file = config("[site]\nhomepage = \"me.example.com\"\n");
        let plan = resolve_plan(&file, &DeployOptions::default(), Some(URL)).unwrap();
        assert_eq!(plan.homepage.as_deref(), Some("me.example.com"));
        assert_eq!(plan.url, "https://me.example.com");
        assert_eq!(plan.base_url, "/");
    }

    #[test]
    fn test_ssh_remote() {
        let plan = resolve_plan(
            &SiteConfig::default(),
            &DeployOptions::default(),
            Some("git@github.com:ada/notes.git"),
        )
        .unwrap();
        assert_eq!(plan.base_url, "/notes/");
        assert_eq!(plan.url, "https://ada.github.io/notes");
    }

    #[test]
    fn test_unknown_host_uses_raw_url() {
        let raw = "https://git.example.com/team/site.git";
        let plan = resolve_plan(&SiteConfig::default(), &DeployOptions::default(), Some(raw)).unwrap();
        assert_eq!(plan.url, raw);
        assert_eq!(plan.base_url, "/site/");
    }

    #[test]
    fn test_missing_remote_url_is_config_error() {
        let options = DeployOptions {
            remote: Some("upstream".to_string()),
            ..Default::default()
        };
        for url in [None, Some(""), Some("   ")] {
            let err = resolve_plan(&SiteConfig::default(), &options, url).unwrap_err();
            assert!(matches!(err, DeployError::Config(_)));
            assert!(err.to_string().contains("'upstream'"));
        }
    }

    #[test]
    fn test_blank_remote_option_means_origin() {
        let options = DeployOptions {
            remote: Some(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(options.remote_name(), "origin");
    }

    #[tokio::test]
    async fn test_resolver_reads_config_and_remote() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("portfolio.toml"),
            "[deploy]\nbranch = \"site\"\n",
        )
        .unwrap();
        let git = Arc::new(FakeGit::repo().with_remote("origin", URL));
        let resolver = ConfigResolver::new(RepositoryInspector::new(git));

        let plan = resolver
            .resolve(dir.path(), &DeployOptions::default())
            .await
            .unwrap();
        assert_eq!(plan.branch, "site");
        assert_eq!(plan.base_url, "/r/");
        assert_eq!(plan.build_path(dir.path()), dir.path().join("dist"));
    }

    #[tokio::test]
    async fn test_resolver_rejects_malformed_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("portfolio.toml"), "[deploy\n").unwrap();
        let git = Arc::new(FakeGit::repo().with_remote("origin", URL));
        let resolver = ConfigResolver::new(RepositoryInspector::new(git));

        let err = resolver
            .resolve(dir.path(), &DeployOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::Config(_)));
    }
}
