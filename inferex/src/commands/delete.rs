use std::future::Future;

use clap::Subcommand;
use serde::Serialize;

use crate::config::Settings;
use crate::error::{InferexError, Result};
use crate::output;

use super::display::{self, OutputFormat, Resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    Projects,
    Deployments,
}

impl DeleteTarget {
    fn noun(self, count: usize) -> &'static str {
        match (self, count) {
            (DeleteTarget::Projects, 1) => "project",
            (DeleteTarget::Projects, _) => "projects",
            (DeleteTarget::Deployments, 1) => "deployment",
            (DeleteTarget::Deployments, _) => "deployments",
        }
    }

    fn resource(self) -> Resource {
        match self {
            DeleteTarget::Projects => Resource::Projects,
            DeleteTarget::Deployments => Resource::Deployments,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeleteArgs {
    pub target: DeleteTarget,
    pub items: Vec<String>,
    pub all: bool,
    pub assume_yes: bool,
    pub output: OutputFormat,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum DeleteCommands {
    /// Delete projects by name
    Project {
        #[arg(value_name = "NAMES")]
        names: Vec<String>,

        /// Delete every project on the account
        #[arg(short = 'a', long)]
        all: bool,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,

        /// Output format for the deleted records
        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Delete deployments by SHA
    Deployment {
        #[arg(value_name = "SHAS")]
        shas: Vec<String>,

        /// Delete every deployment on the account
        #[arg(short = 'a', long)]
        all: bool,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,

        /// Output format for the deleted records
        #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },
}

impl From<DeleteCommands> for DeleteArgs {
    fn from(cmd: DeleteCommands) -> Self {
        match cmd {
            DeleteCommands::Project {
                names,
                all,
                yes,
                output,
            } => DeleteArgs {
                target: DeleteTarget::Projects,
                items: names,
                all,
                assume_yes: yes,
                output,
            },
            DeleteCommands::Deployment {
                shas,
                all,
                yes,
                output,
            } => DeleteArgs {
                target: DeleteTarget::Deployments,
                items: shas,
                all,
                assume_yes: yes,
                output,
            },
        }
    }
}

pub fn run(settings: &Settings, args: DeleteArgs) -> Result<()> {
    let interactive = output::is_interactive();
    validate_confirmation_mode(args.assume_yes, interactive)?;
    validate_selection(&args)?;

    let rt = super::runtime()?;
    rt.block_on(run_async(settings, args, interactive))
}

async fn run_async(settings: &Settings, args: DeleteArgs, interactive: bool) -> Result<()> {
    let client = super::authenticated_client(settings)?;

    let items = if args.all {
        let spinner = output::spinner(format!("Listing {}...", args.target.noun(2)));
        let listed = match args.target {
            DeleteTarget::Projects => client
                .list_projects(None)
                .await
                .map(|records| records.into_iter().map(|p| p.name).collect::<Vec<_>>()),
            DeleteTarget::Deployments => client.list_deployments(None, None).await.map(|records| {
                records
                    .into_iter()
                    .filter_map(|d| d.git_sha)
                    .collect::<Vec<_>>()
            }),
        };
        spinner.finish_and_clear();
        listed?
    } else {
        args.items.clone()
    };

    if items.is_empty() {
        output::muted(&format!("No {} to delete.", args.target.noun(2)));
        return Ok(());
    }

    if should_confirm_delete(args.assume_yes, interactive) {
        let prompt = format!(
            "Delete {} {}?",
            items.len(),
            args.target.noun(items.len())
        );
        let description = confirmation_description(args.target, &items);
        if !output::confirm_with_description(&prompt, Some(&description), false)? {
            output::muted("Aborting delete.");
            return Ok(());
        }
    }

    match args.target {
        DeleteTarget::Projects => {
            let report = delete_each(&items, |name| client.delete_project(name)).await;
            finish(args.target, report, items.len(), args.output)
        }
        DeleteTarget::Deployments => {
            let report = delete_each(&items, |sha| client.delete_deployment(sha)).await;
            finish(args.target, report, items.len(), args.output)
        }
    }
}

fn validate_confirmation_mode(assume_yes: bool, interactive: bool) -> Result<()> {
    if !assume_yes && !interactive {
        return Err(InferexError::Usage(
            "Delete requires --yes in non-interactive mode to avoid accidental removal."
                .to_string(),
        ));
    }
    Ok(())
}

fn should_confirm_delete(assume_yes: bool, interactive: bool) -> bool {
    !assume_yes && interactive
}

fn validate_selection(args: &DeleteArgs) -> Result<()> {
    match (args.all, args.items.is_empty()) {
        (true, false) => Err(InferexError::Usage(format!(
            "Pass either {} or --all, not both.",
            args.target.noun(2)
        ))),
        (false, true) => Err(InferexError::Usage(format!(
            "Nothing to delete: pass one or more {} or --all.",
            args.target.noun(2)
        ))),
        _ => Ok(()),
    }
}

fn confirmation_description(target: DeleteTarget, items: &[String]) -> String {
    let mut description = items.join(", ");
    if target == DeleteTarget::Projects {
        description.push_str("\nProjects may still have running deployments.");
    }
    description
}

/// Result of deleting a batch: what the server returned, and what failed.
#[derive(Debug)]
struct DeleteReport<T> {
    deleted: Vec<T>,
    failed: Vec<(String, InferexError)>,
}

/// Delete every item, continuing past failures.
async fn delete_each<'a, T, F, Fut, E>(items: &'a [String], mut delete: F) -> DeleteReport<T>
where
    F: FnMut(&'a str) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Into<InferexError>,
{
    let mut report = DeleteReport {
        deleted: Vec::new(),
        failed: Vec::new(),
    };
    for item in items {
        match delete(item.as_str()).await {
            Ok(record) => {
                tracing::info!("Deleted {}", item);
                report.deleted.push(record);
            }
            Err(e) => report.failed.push((item.clone(), e.into())),
        }
    }
    report
}

fn finish<T: Serialize>(
    target: DeleteTarget,
    report: DeleteReport<T>,
    total: usize,
    format: OutputFormat,
) -> Result<()> {
    for (item, err) in &report.failed {
        output::error(&format!("Deleting {} could not complete - {}", item, err));
    }
    if !report.deleted.is_empty() {
        display::print(target.resource(), &report.deleted, format)?;
    }
    if report.failed.is_empty() {
        output::success(&format!(
            "Deleted {} {}",
            total,
            target.noun(total)
        ));
        Ok(())
    } else {
        Err(InferexError::PartialFailure {
            count: report.failed.len(),
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;

    fn args(items: &[&str], all: bool) -> DeleteArgs {
        DeleteArgs {
            target: DeleteTarget::Deployments,
            items: items.iter().map(|s| s.to_string()).collect(),
            all,
            assume_yes: true,
            output: OutputFormat::Table,
        }
    }

    #[test]
    fn non_interactive_delete_requires_yes() {
        let err = validate_confirmation_mode(false, false).unwrap_err();
        assert!(err.to_string().contains("--yes"));
        assert!(validate_confirmation_mode(true, false).is_ok());
        assert!(validate_confirmation_mode(false, true).is_ok());
    }

    #[test]
    fn confirm_only_when_interactive_and_not_yes() {
        assert!(should_confirm_delete(false, true));
        assert!(!should_confirm_delete(true, true));
        assert!(!should_confirm_delete(false, false));
    }

    #[test]
    fn selection_needs_items_or_all_but_not_both() {
        assert!(validate_selection(&args(&["ab12cd34"], false)).is_ok());
        assert!(validate_selection(&args(&[], true)).is_ok());
        assert!(validate_selection(&args(&[], false)).is_err());
        assert!(validate_selection(&args(&["ab12cd34"], true)).is_err());
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_batch() {
        let items: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let report = delete_each(&items, |item| async move {
            if item == "b" {
                Err(ApiError::Validation {
                    status: 404,
                    message: "not found".to_string(),
                })
            } else {
                Ok(item.to_uppercase())
            }
        })
        .await;

        assert_eq!(report.deleted, vec!["A".to_string(), "C".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "b");
    }

    #[test]
    fn any_failure_is_a_partial_failure() {
        let report = DeleteReport::<String> {
            deleted: Vec::new(),
            failed: vec![("b".to_string(), InferexError::Usage("x".to_string()))],
        };
        let err = finish(DeleteTarget::Projects, report, 3, OutputFormat::Json).unwrap_err();
        assert_eq!(err.to_string(), "1 of 3 deletions failed");
    }

    #[test]
    fn project_confirmation_warns_about_running_deployments() {
        let description =
            confirmation_description(DeleteTarget::Projects, &["a".to_string(), "b".to_string()]);
        assert!(description.starts_with("a, b"));
        assert!(description.contains("running deployments"));
    }
}
