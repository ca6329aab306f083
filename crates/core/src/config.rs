use crate::error::{Error, Result};
use crate::types::*;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Project configuration file name, looked up in the project directory
pub const CONFIG_FILE_NAME: &str = "portfolio.toml";

/// Project data file names, in lookup order
pub const PROJECT_DATA_FILES: &[(&str, ProjectDataFormat)] = &[
    ("projects.yaml", ProjectDataFormat::Yaml),
    ("projects.yml", ProjectDataFormat::Yaml),
    ("projects.json", ProjectDataFormat::Json),
    ("projects.toml", ProjectDataFormat::Toml),
];

/// `projects.toml` layout: `[[projects]]` tables (or `[[project]]`)
#[derive(Debug, Deserialize)]
struct TomlProjects {
    #[serde(default, alias = "project")]
    projects: Vec<Project>,
}

/// Load `portfolio.toml` from a project directory.
///
/// A missing file yields the default (empty) configuration.
pub fn load_site_config<P: AsRef<Path>>(project_dir: P) -> Result<SiteConfig> {
    let path = project_dir.as_ref().join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(SiteConfig::default());
    }
    let content = fs::read_to_string(&path)?;
    parse_site_config_str(&content)
}

/// Parse `portfolio.toml` from a string (useful for testing)
pub fn parse_site_config_str(content: &str) -> Result<SiteConfig> {
    let config: SiteConfig = toml::from_str(content)?;

    if let Some(output) = &config.site.output
        && output.as_os_str().is_empty()
    {
        return Err(Error::ConfigParse("site.output must not be empty".to_string()));
    }
    if let Some(branch) = &config.deploy.branch
        && branch.trim().is_empty()
    {
        return Err(Error::ConfigParse("deploy.branch must not be empty".to_string()));
    }

    Ok(config)
}

/// Locate the project data file in a project directory.
///
/// Pure existence check: nothing is read or parsed.
pub fn find_project_data<P: AsRef<Path>>(project_dir: P) -> Option<ProjectDataFile> {
    let project_dir = project_dir.as_ref();
    PROJECT_DATA_FILES.iter().find_map(|(name, format)| {
        let path = project_dir.join(name);
        path.is_file().then(|| ProjectDataFile {
            path,
            format: *format,
        })
    })
}

/// Read and parse a located project data file
pub fn parse_projects(file: &ProjectDataFile) -> Result<Vec<Project>> {
    let content = fs::read_to_string(&file.path)?;
    let name = file
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.path.display().to_string());

    parse_projects_str(&content, file.format).map_err(|e| match e {
        Error::InvalidData(message) => Error::ProjectData {
            file: name,
            message,
        },
        other => other,
    })
}

/// Parse project data from a string in the given format
pub fn parse_projects_str(content: &str, format: ProjectDataFormat) -> Result<Vec<Project>> {
    let projects: Vec<Project> = match format {
        ProjectDataFormat::Yaml => {
            let value: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| Error::InvalidData(e.to_string()))?;
            let list = match value {
                serde_yaml::Value::Mapping(mut map) => map
                    .remove("projects")
                    .ok_or_else(|| Error::InvalidData("expected a `projects` list".to_string()))?,
                serde_yaml::Value::Null => serde_yaml::Value::Sequence(vec![]),
                other => other,
            };
            serde_yaml::from_value(list).map_err(|e| Error::InvalidData(e.to_string()))?
        }
        ProjectDataFormat::Json => {
            let value: serde_json::Value =
                serde_json::from_str(content).map_err(|e| Error::InvalidData(e.to_string()))?;
            let list = match value {
                serde_json::Value::Object(mut map) => map
                    .remove("projects")
                    .ok_or_else(|| Error::InvalidData("expected a `projects` list".to_string()))?,
                other => other,
            };
            serde_json::from_value(list).map_err(|e| Error::InvalidData(e.to_string()))?
        }
        ProjectDataFormat::Toml => {
            let raw: TomlProjects =
                toml::from_str(content).map_err(|e| Error::InvalidData(e.to_string()))?;
            raw.projects
        }
    };

    for (index, project) in projects.iter().enumerate() {
        if project.title.trim().is_empty() {
            return Err(Error::InvalidData(format!(
                "project #{} has an empty title",
                index + 1
            )));
        }
        if let Some(image) = &project.image
            && !is_remote_url(image)
        {
            validate_path(image, "image")
                .map_err(|e| Error::InvalidData(format!("project '{}': {}", project.title, e)))?;
        }
    }

    Ok(projects)
}

fn is_remote_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://") || value.starts_with("//")
}

/// Validate and convert a path string to PathBuf.
///
/// Rejects absolute paths and parent directory references (`..`) so that
/// project data cannot point the build outside the project directory.
///
/// ```text
/// validate_path("static/shot.png", "image")    → Ok(PathBuf)
/// validate_path("/etc/passwd", "image")        → Err("Absolute paths not allowed...")
/// validate_path("../../secret.png", "image")   → Err("Parent directory references...")
/// ```
pub fn validate_path(path_str: &str, field_name: &str) -> Result<PathBuf> {
    let path = Path::new(path_str);

    if path.is_absolute() {
        return Err(Error::ConfigParse(format!(
            "Absolute paths not allowed in '{}': '{}'. Use relative paths only.",
            field_name, path_str
        )));
    }

    for component in path.components() {
        if component == std::path::Component::ParentDir {
            return Err(Error::ConfigParse(format!(
                "Parent directory references (..) not allowed in '{}': '{}'",
                field_name, path_str
            )));
        }
    }

    if path_str.trim().is_empty() {
        return Err(Error::ConfigParse(format!(
            "Empty path in '{}' field",
            field_name
        )));
    }

    Ok(path.to_path_buf())
}
