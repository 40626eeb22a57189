use std::time::Duration;

use inferex_core::{DeployPhase, StatusReport};
use tokio::time::sleep;

use super::{ApiError, DeploymentApi, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// 15 minutes at the default interval.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 450;

/// Fixed-interval, bounded status polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    /// `Deployed` or `Failed`.
    pub phase: DeployPhase,
    pub report: StatusReport,
    pub attempts: u32,
}

/// Poll `/deployments/status` until the task reaches a terminal state.
///
/// `on_report` sees every report, terminal or not. Fails with
/// [`ApiError::Timeout`] once `max_attempts` reports came back non-terminal.
pub async fn poll_deployment<A, F>(
    api: &A,
    task_id: &str,
    policy: PollPolicy,
    mut on_report: F,
) -> Result<PollOutcome>
where
    A: DeploymentApi + ?Sized,
    F: FnMut(&StatusReport),
{
    let mut attempts = 0u32;
    loop {
        let report = api.deployment_status(task_id).await?;
        attempts += 1;
        on_report(&report);

        let phase = report.phase();
        tracing::debug!(
            "Task {} attempt {}: state={:?} phase={}",
            task_id,
            attempts,
            report.state,
            phase
        );
        if phase.is_terminal() {
            return Ok(PollOutcome {
                phase,
                report,
                attempts,
            });
        }

        if attempts >= policy.max_attempts {
            return Err(ApiError::Timeout {
                task_id: task_id.to_string(),
                attempts,
            });
        }

        sleep(policy.interval).await;
    }
}

/// Tracks stage/substage so only changes are shown.
#[derive(Debug, Default)]
pub struct StageTracker {
    stage: Option<String>,
    substage: Option<String>,
}

/// A line to show for a status report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Stage(String),
    Substage(String),
    Exception(String),
}

impl StageTracker {
    pub fn observe(&mut self, report: &StatusReport) -> Vec<StageEvent> {
        let mut events = Vec::new();
        if let Some(stage) = report.stage.as_deref().filter(|s| !s.is_empty())
            && self.stage.as_deref() != Some(stage)
        {
            self.stage = Some(stage.to_string());
            events.push(StageEvent::Stage(stage.to_string()));
        }
        if let Some(substage) = report.substage.as_deref().filter(|s| !s.is_empty())
            && self.substage.as_deref() != Some(substage)
        {
            self.substage = Some(substage.to_string());
            events.push(StageEvent::Substage(substage.to_string()));
        }
        if let Some(exception) = report.exception.as_deref().filter(|s| !s.is_empty()) {
            events.push(StageEvent::Exception(exception.to_string()));
        }
        events
    }
}
