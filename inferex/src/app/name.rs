use std::path::Path;

use thiserror::Error;

use crate::config::ProjectManifest;

pub const FALLBACK_PROJECT_NAME: &str = "untitled";
const MAX_NAME_LEN: usize = 63;

/// Errors that can occur during project name resolution
#[derive(Debug, Error)]
pub enum ProjectNameError {
    #[error("Project name validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ProjectNameError>;

/// Where a resolved project name came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    Flag,
    Manifest,
    Directory,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub name: String,
    pub source: NameSource,
}

/// Resolve the project name for a deploy
///
/// Resolution order:
/// 1. `--project-name` flag
/// 2. `inferex.yaml` `project.name`
/// 3. Project directory name
/// 4. `untitled`
pub fn resolve_project_name(
    flag: Option<&str>,
    manifest: Option<&ProjectManifest>,
    dir: &Path,
) -> Result<ResolvedName> {
    if let Some(name) = flag.map(str::trim).filter(|n| !n.is_empty()) {
        return Ok(ResolvedName {
            name: validate_project_name(name)?,
            source: NameSource::Flag,
        });
    }

    if let Some(manifest) = manifest {
        return Ok(ResolvedName {
            name: validate_project_name(manifest.name())?,
            source: NameSource::Manifest,
        });
    }

    let dir_name = dir
        .canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(dir)
        .file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string());

    if let Some(name) = dir_name
        && let Ok(name) = validate_project_name(&name)
    {
        return Ok(ResolvedName {
            name,
            source: NameSource::Directory,
        });
    }

    Ok(ResolvedName {
        name: FALLBACK_PROJECT_NAME.to_string(),
        source: NameSource::Fallback,
    })
}

/// Validate a project name
///
/// Rules:
/// - 1-63 characters after trimming
/// - Letters, numbers, `-`, `_` and `.` only
pub fn validate_project_name(name: &str) -> Result<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ProjectNameError::Validation(
            "Project name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(ProjectNameError::Validation(format!(
            "Project name cannot exceed {} characters",
            MAX_NAME_LEN
        )));
    }

    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(ProjectNameError::Validation(format!(
            "Project name '{}' contains invalid character '{}'",
            name, bad
        )));
    }

    Ok(name.to_string())
}
