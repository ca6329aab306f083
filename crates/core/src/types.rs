use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Relative base URL; treated as "not configured" when resolving a deploy
pub const TRIVIAL_BASE_URL: &str = "./";

/// Complete project configuration (`portfolio.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub site: SiteSettings,
    #[serde(default)]
    pub deploy: DeploySettings,
}

/// Site generation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Build output directory, relative to the project directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Custom domain (e.g., "me.example.com"), written to CNAME on deploy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

impl SiteSettings {
    /// The configured base URL, unless it is missing or the trivial default
    pub fn explicit_base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty() && *url != TRIVIAL_BASE_URL)
    }

    /// The configured custom domain, if it is non-blank
    pub fn custom_domain(&self) -> Option<&str> {
        self.homepage
            .as_deref()
            .map(str::trim)
            .filter(|domain| !domain.is_empty())
    }
}

/// Deployment settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploySettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_timeout_secs: Option<u64>,
}

/// A single portfolio entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    /// Markdown description
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Project {
    /// Get a URL-safe slug from the title
    pub fn slug(&self) -> String {
        self.title
            .to_lowercase()
            .replace(char::is_whitespace, "-")
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-')
            .collect()
    }
}

/// Supported project data formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectDataFormat {
    Yaml,
    Json,
    Toml,
}

impl fmt::Display for ProjectDataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectDataFormat::Yaml => write!(f, "yaml"),
            ProjectDataFormat::Json => write!(f, "json"),
            ProjectDataFormat::Toml => write!(f, "toml"),
        }
    }
}

/// A located project data file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectDataFile {
    pub path: PathBuf,
    pub format: ProjectDataFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_base_url_ignores_trivial_default() {
        let mut site = SiteSettings::default();
        assert_eq!(site.explicit_base_url(), None);

        site.base_url = Some("./".to_string());
        assert_eq!(site.explicit_base_url(), None);

        site.base_url = Some("/portfolio/".to_string());
        assert_eq!(site.explicit_base_url(), Some("/portfolio/"));
    }

    #[test]
    fn test_custom_domain_ignores_blank() {
        let mut site = SiteSettings::default();
        site.homepage = Some("   ".to_string());
        assert_eq!(site.custom_domain(), None);

        site.homepage = Some("me.example.com".to_string());
        assert_eq!(site.custom_domain(), Some("me.example.com"));
    }

    #[test]
    fn test_project_slug() {
        let project = Project {
            title: "Ray Tracer (Rust)".to_string(),
            description: String::new(),
            url: None,
            repo: None,
            tags: vec![],
            image: None,
        };
        assert_eq!(project.slug(), "ray-tracer-rust");
    }
}
