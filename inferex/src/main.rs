mod cli;
mod commands;
mod error;
mod output;
mod paths;

pub mod api;
pub mod app;
pub mod build;
pub mod config;
pub mod validation;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() {
    // Parse CLI arguments early so we can configure logging/output.
    let cli = Cli::parse();

    crate::output::set_verbose(cli.verbose);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            if cli.verbose {
                EnvFilter::new("info")
            } else {
                EnvFilter::new("warn")
            }
        }))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli.run() {
        tracing::debug!("Command failed: {:?}", e.kind());
        crate::output::error_stderr(&e.to_string());
        std::process::exit(e.exit_code());
    }
}
