use std::path::Path;

use clap::Subcommand;

use crate::app::resolve_project_name;
use crate::config::{ProjectManifest, Settings, project_root};
use crate::error::Result;
use crate::output;

use super::display::{self, OutputFormat, Resource};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum GetCommands {
    /// List projects, or show one by name or project path
    Projects {
        #[arg(value_name = "NAME|PATH")]
        name: Option<String>,

        /// Output format
        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// List deployments, or show one by SHA
    Deployments {
        #[arg(value_name = "SHA")]
        sha: Option<String>,

        /// Only deployments of this project (name or path)
        #[arg(long)]
        project: Option<String>,

        /// Output format
        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// List the pipelines a deployment serves
    Pipelines {
        #[arg(value_name = "SHA")]
        sha: String,

        /// Output format
        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

pub fn run(settings: &Settings, cmd: GetCommands) -> Result<()> {
    let rt = super::runtime()?;
    rt.block_on(run_async(settings, cmd))
}

async fn run_async(settings: &Settings, cmd: GetCommands) -> Result<()> {
    let client = super::authenticated_client(settings)?;

    match cmd {
        GetCommands::Projects {
            name,
            output: format,
        } => {
            let name = name.as_deref().map(name_or_path).transpose()?;
            let spinner = output::spinner("Fetching projects...");
            let records = client.list_projects(name.as_deref()).await;
            spinner.finish_and_clear();
            display::print(Resource::Projects, &records?, format)
        }
        GetCommands::Deployments {
            sha,
            project,
            output: format,
        } => {
            let project = project.as_deref().map(name_or_path).transpose()?;
            let spinner = output::spinner("Fetching deployments...");
            let records = client
                .list_deployments(sha.as_deref(), project.as_deref())
                .await;
            spinner.finish_and_clear();
            display::print(Resource::Deployments, &records?, format)
        }
        GetCommands::Pipelines {
            sha,
            output: format,
        } => {
            let spinner = output::spinner("Fetching pipelines...");
            let records = client.list_pipelines(&sha).await;
            spinner.finish_and_clear();
            display::print(Resource::Pipelines, &records?, format)
        }
    }
}

/// A project argument may be a name or a path to a project directory (or
/// its `inferex.yaml`); paths resolve to the project's name.
pub fn name_or_path(value: &str) -> Result<String> {
    let path = Path::new(value);
    if !path.exists() {
        return Ok(value.to_string());
    }
    let root = project_root(path);
    let manifest = ProjectManifest::load_optional(&root)?.map(|(manifest, _)| manifest);
    let resolved = resolve_project_name(None, manifest.as_ref(), &root)?;
    tracing::debug!("Resolved {} to project {}", value, resolved.name);
    Ok(resolved.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn plain_name_passes_through() {
        assert_eq!(
            name_or_path("definitely-not-a-local-dir-7f3a").unwrap(),
            "definitely-not-a-local-dir-7f3a"
        );
    }

    #[test]
    fn project_dir_resolves_to_manifest_name() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("inferex.yaml"),
            "project:\n  name: sentiment\n",
        )
        .unwrap();
        let dir = temp.path().to_string_lossy().to_string();
        assert_eq!(name_or_path(&dir).unwrap(), "sentiment");

        let file = temp.path().join("inferex.yaml");
        assert_eq!(name_or_path(&file.to_string_lossy()).unwrap(), "sentiment");
    }

    #[test]
    fn dir_without_manifest_uses_dir_name() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("classifier");
        fs::create_dir(&dir).unwrap();
        assert_eq!(name_or_path(&dir.to_string_lossy()).unwrap(), "classifier");
    }
}
