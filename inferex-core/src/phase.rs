//! Deploy phases
//!
//! `Unauthenticated -> Archiving -> Uploading -> Building -> {Deployed | Failed}`.
//! Only `Building` is observed remotely; the rest are local steps.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployPhase {
    Unauthenticated,
    Archiving,
    Uploading,
    Building,
    Deployed,
    Failed,
}

impl DeployPhase {
    /// Interpret the control plane's task state.
    ///
    /// Anything that is not a recognised terminal state counts as still
    /// building, so new intermediate states never end a poll early.
    pub fn from_remote_state(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "success" | "succeeded" | "deployed" => DeployPhase::Deployed,
            "failed" | "failure" | "error" | "revoked" => DeployPhase::Failed,
            _ => DeployPhase::Building,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DeployPhase::Deployed | DeployPhase::Failed)
    }

    /// Legal forward transitions.
    pub fn can_advance_to(self, next: DeployPhase) -> bool {
        use DeployPhase::*;
        matches!(
            (self, next),
            (Unauthenticated, Archiving)
                | (Archiving, Uploading)
                | (Uploading, Building)
                | (Building, Building)
                | (Building, Deployed)
                | (Building, Failed)
        )
    }
}

impl std::fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployPhase::Unauthenticated => write!(f, "UNAUTHENTICATED"),
            DeployPhase::Archiving => write!(f, "ARCHIVING"),
            DeployPhase::Uploading => write!(f, "UPLOADING"),
            DeployPhase::Building => write!(f, "BUILDING"),
            DeployPhase::Deployed => write!(f, "DEPLOYED"),
            DeployPhase::Failed => write!(f, "FAILED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_states_are_case_insensitive() {
        assert_eq!(DeployPhase::from_remote_state("SUCCESS"), DeployPhase::Deployed);
        assert_eq!(DeployPhase::from_remote_state("Failed"), DeployPhase::Failed);
        assert_eq!(DeployPhase::from_remote_state("BUILDING"), DeployPhase::Building);
        assert_eq!(DeployPhase::from_remote_state("PENDING"), DeployPhase::Building);
        assert_eq!(DeployPhase::from_remote_state(""), DeployPhase::Building);
    }

    #[test]
    fn only_deployed_and_failed_are_terminal() {
        assert!(DeployPhase::Deployed.is_terminal());
        assert!(DeployPhase::Failed.is_terminal());
        assert!(!DeployPhase::Building.is_terminal());
        assert!(!DeployPhase::Unauthenticated.is_terminal());
    }

    #[test]
    fn transitions_follow_the_deploy_order() {
        assert!(DeployPhase::Unauthenticated.can_advance_to(DeployPhase::Archiving));
        assert!(DeployPhase::Uploading.can_advance_to(DeployPhase::Building));
        assert!(DeployPhase::Building.can_advance_to(DeployPhase::Failed));
        assert!(!DeployPhase::Archiving.can_advance_to(DeployPhase::Deployed));
        assert!(!DeployPhase::Deployed.can_advance_to(DeployPhase::Building));
    }

    #[test]
    fn display_uses_upper_case_names() {
        assert_eq!(DeployPhase::Building.to_string(), "BUILDING");
        assert_eq!(DeployPhase::Deployed.to_string(), "DEPLOYED");
    }
}
