//! Inferex control plane wire types
//!
//! These types mirror the JSON bodies returned by the control plane. Fields
//! the CLI does not interpret are kept in `extra` so JSON/YAML output shows
//! the full record.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::DeployPhase;

/// Number of hex characters of the content hash used as a deployment SHA.
pub const SHORT_SHA_LENGTH: usize = 8;

/// Response from `POST /login`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// A project as reported by `/projects`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectRecord {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated_at: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A deployment as reported by `/deployments`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeploymentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A pipeline (HTTP endpoint) exposed by a deployment
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Some backends send a bool, older ones a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_async: Option<serde_json::Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Response from `POST /deployments` once the archive is accepted
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UploadReceipt {
    /// Identifier to poll `/deployments/status` with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_sha: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Response from `GET /deployments/status`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatusReport {
    #[serde(default)]
    pub state: Option<String>,

    #[serde(default)]
    pub stage: Option<String>,

    #[serde(default)]
    pub substage: Option<String>,

    #[serde(default)]
    pub exception: Option<String>,
}

impl StatusReport {
    /// Map the remote task state onto the local deploy phase.
    pub fn phase(&self) -> DeployPhase {
        DeployPhase::from_remote_state(self.state.as_deref().unwrap_or_default())
    }
}

/// Error body returned by the control plane on non-2xx responses.
///
/// `detail` is either a plain message or a list of field violations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| {
                        item.get("msg")
                            .and_then(|m| m.as_str())
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| item.to_string())
                    })
                    .collect();
                Some(parts.join("; "))
            }
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// One log entry: nanosecond unix timestamp and the raw line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogLine(
    #[serde(deserialize_with = "string_or_number")] pub String,
    pub String,
);

impl LogLine {
    pub fn timestamp_nanos(&self) -> Option<i128> {
        self.0.trim().parse().ok()
    }

    pub fn text(&self) -> &str {
        &self.1
    }
}

/// Response from `GET /logs`: container name to its log lines.
pub type LogStreams = BTreeMap<String, Vec<LogLine>>;

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number timestamp, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_record_keeps_unknown_fields() {
        let json = r#"{"git_sha":"ab12cd34","project_name":"demo","replicas":2}"#;
        let record: DeploymentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.git_sha.as_deref(), Some("ab12cd34"));
        assert_eq!(record.extra.get("replicas"), Some(&serde_json::json!(2)));

        let back = serde_json::to_string(&record).unwrap();
        assert!(back.contains(r#""replicas":2"#));
        assert!(!back.contains("deployment_url"));
    }

    #[test]
    fn status_report_maps_success_to_deployed() {
        let report: StatusReport =
            serde_json::from_str(r#"{"state":"SUCCESS","stage":"done"}"#).unwrap();
        assert_eq!(report.phase(), DeployPhase::Deployed);
    }

    #[test]
    fn status_report_without_state_is_building() {
        let report: StatusReport = serde_json::from_str("{}").unwrap();
        assert_eq!(report.phase(), DeployPhase::Building);
    }

    #[test]
    fn error_body_joins_field_violations() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"detail":[{"loc":["query","project_name"],"msg":"field required"},{"msg":"too long"}]}"#,
        )
        .unwrap();
        assert_eq!(body.message().as_deref(), Some("field required; too long"));
    }

    #[test]
    fn error_body_plain_detail() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail":"Project exists"}"#).unwrap();
        assert_eq!(body.message().as_deref(), Some("Project exists"));
        let empty: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(empty.message().is_none());
    }

    #[test]
    fn log_streams_accept_string_and_numeric_timestamps() {
        let json = r#"{"build-log":[["1650000000000000000","step 1"]],"app":[[1650000001000000000,"ready"]]}"#;
        let streams: LogStreams = serde_json::from_str(json).unwrap();
        assert_eq!(streams["build-log"][0].text(), "step 1");
        assert_eq!(
            streams["app"][0].timestamp_nanos(),
            Some(1_650_000_001_000_000_000)
        );
    }
}
