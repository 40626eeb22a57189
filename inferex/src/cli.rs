use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};

use crate::commands::delete::{DeleteArgs, DeleteCommands};
use crate::commands::deploy::DeployArgs;
use crate::commands::get::GetCommands;
use crate::commands::logs::{DEFAULT_LOG_LIMIT, LogsArgs};
use crate::commands;
use crate::config::Settings;
use crate::error::Result;

/// Inferex - deploy inference pipelines from the command line
#[derive(Parser)]
#[command(name = "inferex")]
#[command(version, disable_version_flag = true)]
#[command(about = "Inferex - deploy inference pipelines from the command line")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Show version
    #[arg(long, global = true)]
    pub version: bool,

    /// Show verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store an access token
    Login {
        /// Account email
        #[arg(short = 'u', long, env = "INFEREX_USERNAME")]
        username: Option<String>,

        /// Account password ('-' reads it from stdin)
        #[arg(short = 'p', long, env = "INFEREX_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an inferex.yaml for a project
    Init {
        /// Project directory (defaults to current directory)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Project name (prompted for when omitted)
        #[arg(long)]
        project_name: Option<String>,
    },

    /// Package and deploy a project
    Deploy {
        /// Project directory (defaults to current directory)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Deploy under a fresh SHA even if nothing changed
        #[arg(short = 'f', long)]
        force: bool,

        /// Access token to use instead of the stored one
        #[arg(long, env = "INFEREX_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Return once the upload is accepted
        #[arg(short = 'd', long)]
        detach: bool,

        /// Deploy under this name instead of the manifest's
        #[arg(long)]
        project_name: Option<String>,
    },

    /// Show logs of a deployment
    Logs {
        /// Deployment SHA
        #[arg(value_name = "SHA")]
        sha: String,

        /// Total number of lines across all streams
        #[arg(long, default_value_t = DEFAULT_LOG_LIMIT)]
        limit: u32,

        /// How far back to look, e.g. 30s, 5m, 1h, 2d, 1w
        #[arg(long)]
        earliest: Option<String>,

        /// Nothing more recent than this long ago
        #[arg(long)]
        latest: Option<String>,
    },

    /// List projects, deployments or pipelines
    #[command(subcommand)]
    Get(GetCommands),

    /// Delete projects or deployments
    #[command(subcommand)]
    Delete(DeleteCommands),

    /// Remove the stored access token
    #[command(visible_alias = "logout")]
    Reset,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        if self.version {
            println!("{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        let Some(command) = self.command else {
            Cli::command().print_help()?;
            println!();
            return Ok(());
        };

        let settings = Settings::from_env()?;
        tracing::debug!("Using API at {}", settings.api_root);

        match command {
            Commands::Login { username, password } => {
                commands::login::run(&settings, username, password)
            }
            Commands::Init { path, project_name } => commands::init::run(path, project_name),
            Commands::Deploy {
                path,
                force,
                token,
                detach,
                project_name,
            } => commands::deploy::run(
                &settings,
                DeployArgs {
                    path,
                    force,
                    token,
                    detach,
                    project_name,
                },
            ),
            Commands::Logs {
                sha,
                limit,
                earliest,
                latest,
            } => commands::logs::run(
                &settings,
                LogsArgs {
                    sha,
                    limit,
                    earliest,
                    latest,
                },
            ),
            Commands::Get(cmd) => commands::get::run(&settings, cmd),
            Commands::Delete(cmd) => commands::delete::run(&settings, DeleteArgs::from(cmd)),
            Commands::Reset => commands::reset::run(&settings),
        }
    }
}
