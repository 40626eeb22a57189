//! Control plane HTTP API
//!
//! [`ApiClient`] issues one request per call and maps failures onto
//! [`ApiError`]. The deploy flow only depends on [`DeploymentApi`], so it can
//! be driven by a fake in tests.

mod client;
mod error;
pub(crate) mod poll;

pub use client::*;
pub use error::*;
pub use poll::*;

use async_trait::async_trait;
use inferex_core::{ProjectRecord, StatusReport, UploadReceipt};

/// Archive upload parameters for `POST /deployments`
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    pub project_name: &'a str,
    pub git_sha: &'a str,
    /// The gzip-compressed project archive.
    pub archive: Vec<u8>,
    /// Ask the server to keep the build task observable via `/deployments/status`.
    pub stream: bool,
}

/// The calls the deploy flow makes, in order.
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Create (or look up) the project; the server may normalize the name.
    async fn create_project(&self, name: &str) -> Result<ProjectRecord>;

    async fn upload_deployment(&self, request: UploadRequest<'_>) -> Result<UploadReceipt>;

    async fn deployment_status(&self, task_id: &str) -> Result<StatusReport>;
}
