use std::path::{Path, PathBuf};

use inferex_core::{DeployPhase, StatusReport};

use crate::api::{
    ApiClient, ApiError, DeploymentApi, PollPolicy, StageEvent, StageTracker, UploadRequest,
    poll_deployment,
};
use crate::app::{NameSource, resolve_project_name};
use crate::build::{ArchiveOptions, ArchivePayload, build_archive, deployment_sha};
use crate::config::{CredentialError, ProjectManifest, Settings, project_root};
use crate::error::{InferexError, Result};
use crate::output;

#[derive(Debug, Clone, Default)]
pub struct DeployArgs {
    pub path: Option<PathBuf>,
    pub force: bool,
    pub token: Option<String>,
    pub detach: bool,
    pub project_name: Option<String>,
}

/// What a finished deploy produced
#[derive(Debug, Clone, PartialEq)]
pub struct DeployOutcome {
    pub phase: DeployPhase,
    pub project_name: String,
    pub git_sha: String,
    pub task_id: Option<String>,
    pub report: Option<StatusReport>,
}

/// Local view of the deploy state machine.
#[derive(Debug)]
struct DeployState {
    phase: DeployPhase,
    history: Vec<DeployPhase>,
}

impl DeployState {
    fn new() -> Self {
        Self {
            phase: DeployPhase::Unauthenticated,
            history: vec![DeployPhase::Unauthenticated],
        }
    }

    fn advance(&mut self, next: DeployPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal deploy transition {} -> {}",
            self.phase,
            next
        );
        tracing::debug!("Deploy phase {} -> {}", self.phase, next);
        self.phase = next;
        if self.history.last() != Some(&next) {
            self.history.push(next);
        }
    }
}

pub fn run(settings: &Settings, args: DeployArgs) -> Result<()> {
    let rt = super::runtime()?;
    rt.block_on(run_async(settings, args))
}

async fn run_async(settings: &Settings, args: DeployArgs) -> Result<()> {
    let settings = settings.clone().with_token_override(args.token.clone());
    let root = match &args.path {
        Some(path) => project_root(path),
        None => std::env::current_dir()?,
    };
    if !root.exists() {
        return Err(crate::build::BuildError::MissingProject(root).into());
    }

    output::section("Deploy");

    // UNAUTHENTICATED: no request leaves before a token is in hand.
    let token = match super::resolve_token(&settings) {
        Ok(token) => token,
        Err(CredentialError::NotAuthenticated(path)) => {
            if !output::is_interactive() {
                return Err(CredentialError::NotAuthenticated(path).into());
            }
            output::warning("You are not logged in.");
            super::login::login_interactively(&settings, None, None)
                .await?
                .access_token
        }
        Err(e) => return Err(e.into()),
    };

    let client = ApiClient::new(settings.api_root.clone(), Some(token))?
        .with_request_timeout(settings.request_timeout);
    tracing::info!("Deploying {} to {}", root.display(), client.base_url());
    let outcome = deploy_project(&client, &root, &args, settings.poll).await?;

    match outcome.phase {
        DeployPhase::Deployed => {
            output::success(&format!(
                "Deployed {} ({})",
                output::emphasized(&outcome.project_name),
                outcome.git_sha
            ));
        }
        DeployPhase::Uploading | DeployPhase::Building => {
            output::success(&format!(
                "Uploaded {} ({}). Check progress with `inferex get deployments {}`.",
                output::emphasized(&outcome.project_name),
                outcome.git_sha,
                outcome.git_sha
            ));
        }
        _ => {}
    }
    Ok(())
}

/// Archive, upload and (unless detached) follow the build to a terminal
/// state. The caller has already authenticated `api`.
pub async fn deploy_project<A>(
    api: &A,
    root: &Path,
    args: &DeployArgs,
    poll: PollPolicy,
) -> Result<DeployOutcome>
where
    A: DeploymentApi + ?Sized,
{
    let mut state = DeployState::new();
    let result = drive(api, root, args, poll, &mut state).await;
    tracing::debug!("Deploy phases: {:?}", state.history);
    result
}

async fn drive<A>(
    api: &A,
    root: &Path,
    args: &DeployArgs,
    poll: PollPolicy,
    state: &mut DeployState,
) -> Result<DeployOutcome>
where
    A: DeploymentApi + ?Sized,
{
    state.advance(DeployPhase::Archiving);

    let manifest = match ProjectManifest::load_optional(root)? {
        Some((manifest, warnings)) => {
            for warning in warnings {
                output::warning(&warning);
            }
            Some(manifest)
        }
        None => None,
    };
    let resolved = resolve_project_name(args.project_name.as_deref(), manifest.as_ref(), root)?;
    match (resolved.source, &manifest) {
        (NameSource::Flag, Some(manifest)) if manifest.name() != resolved.name => {
            output::muted(&format!(
                "Using specified project name \"{}\" and not the one in inferex.yaml \"{}\"",
                resolved.name,
                manifest.name()
            ));
        }
        (NameSource::Directory | NameSource::Fallback, _) => {
            output::muted(&format!(
                "inferex.yaml was not found, project name defaulting to: {}",
                resolved.name
            ));
        }
        _ => {}
    }

    let spinner = output::spinner("Packaging project...");
    let payload = build_archive(root, &ArchiveOptions::default());
    spinner.finish_and_clear();
    let payload: ArchivePayload = payload?;

    if payload.exceeds_size_warning() {
        output::warning(&format!(
            "Project is {}. Maybe you've left your venv or weights in the project. \
             Use a .ixignore file and pull artifacts at build time.",
            output::format_size(payload.content_bytes)
        ));
    }
    let git_sha = deployment_sha(&payload.sha256, args.force)?;
    output::step(&format!(
        "Packaged {} files ({}), deployment SHA {}",
        payload.file_count,
        output::format_size(payload.archive_bytes),
        output::emphasized(&git_sha)
    ));

    state.advance(DeployPhase::Uploading);

    let project = api.create_project(&resolved.name).await?;
    let project_name = if project.name.trim().is_empty() {
        resolved.name.clone()
    } else {
        project.name.clone()
    };

    let archive = payload.read_bytes()?;
    let archive_bytes = payload.archive_bytes;
    // Temp archive is removed here; the rest only talks to the API.
    drop(payload);

    let spinner = output::spinner(format!(
        "Uploading {}...",
        output::format_size(archive_bytes)
    ));
    let receipt = api
        .upload_deployment(UploadRequest {
            project_name: &project_name,
            git_sha: &git_sha,
            archive,
            stream: !args.detach,
        })
        .await;
    spinner.finish_and_clear();
    let receipt = receipt?;

    if args.detach {
        return Ok(DeployOutcome {
            phase: state.phase,
            project_name,
            git_sha,
            task_id: receipt.task_id,
            report: None,
        });
    }

    let task_id = receipt.task_id.ok_or_else(|| ApiError::InvalidResponse {
        endpoint: "/deployments".to_string(),
        reason: "upload response has no task_id".to_string(),
    })?;

    state.advance(DeployPhase::Building);

    let mut tracker = StageTracker::default();
    let polled = poll_deployment(api, &task_id, poll, |report| {
        for event in tracker.observe(report) {
            show_stage_event(&event);
        }
    })
    .await?;

    state.advance(polled.phase);

    if polled.phase == DeployPhase::Failed {
        let reason = polled
            .report
            .exception
            .clone()
            .or_else(|| polled.report.state.clone())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(InferexError::DeployFailed {
            sha: git_sha,
            reason,
        });
    }

    Ok(DeployOutcome {
        phase: state.phase,
        project_name,
        git_sha,
        task_id: Some(task_id),
        report: Some(polled.report),
    })
}

fn show_stage_event(event: &StageEvent) {
    match event {
        StageEvent::Stage(stage) => println!("{} {}", output::brand_accent("→"), stage),
        StageEvent::Substage(substage) => output::substep(substage),
        StageEvent::Exception(exception) => output::warning(exception),
    }
}
