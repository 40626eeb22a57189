use std::path::{Path, PathBuf};

use crate::app::{resolve_project_name, validate_project_name};
use crate::config::{MANIFEST_FILE_NAME, ProjectManifest};
use crate::error::{InferexError, Result};
use crate::output;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Created(PathBuf),
    AlreadyExists(PathBuf),
}

pub fn run(path: Option<PathBuf>, project_name: Option<String>) -> Result<()> {
    let dir = match path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    if !dir.is_dir() {
        return Err(InferexError::Usage(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let name = match project_name {
        Some(name) => validate_project_name(&name)?,
        None => prompt_project_name(&dir)?,
    };

    match init_project(&dir, &name)? {
        InitOutcome::AlreadyExists(path) => {
            output::muted(&format!(
                "{} already exists, leaving it untouched.",
                path.display()
            ));
        }
        InitOutcome::Created(path) => {
            output::success(&format!(
                "Project {} initialized in {}",
                output::emphasized(&name),
                dir.display()
            ));
            output::muted(&format!(
                "Edit {} to customize deployment parameters.",
                path.display()
            ));
        }
    }
    Ok(())
}

fn prompt_project_name(dir: &Path) -> Result<String> {
    let suggested = resolve_project_name(None, None, dir)?.name;
    let answer = output::prompt_input("Project name", false, Some(&suggested))?;
    Ok(validate_project_name(&answer)?)
}

/// Write the template manifest unless the project already has one.
pub fn init_project(dir: &Path, name: &str) -> Result<InitOutcome> {
    let path = dir.join(MANIFEST_FILE_NAME);
    if path.is_file() {
        return Ok(InitOutcome::AlreadyExists(path));
    }
    let written = ProjectManifest::default_for(name).write_to_dir(dir)?;
    tracing::info!("Wrote {}", written.display());
    Ok(InitOutcome::Created(written))
}
