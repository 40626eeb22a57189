use std::time::Duration;

use async_trait::async_trait;
use inferex_core::{
    DeploymentRecord, ErrorBody, LoginResponse, LogStreams, PipelineRecord, ProjectRecord,
    StatusReport, UploadReceipt,
};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{ApiError, DeploymentApi, Result, UploadRequest};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Per-request bound, so a silent server cannot stall status polling.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
/// Uploads carry the whole archive and get a longer bound.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(15 * 60);
const ARCHIVE_MIME: &str = "application/gzip";

pub fn user_agent() -> String {
    format!(
        "inferex v{} {}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

/// `GET /logs` parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub git_sha: String,
    pub limit: u32,
    /// ISO-8601 UTC lower bound.
    pub start: Option<String>,
    /// ISO-8601 UTC upper bound.
    pub end: Option<String>,
}

impl LogQuery {
    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("git_sha", self.git_sha.clone()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(start) = &self.start {
            params.push(("start", start.clone()));
        }
        if let Some(end) = &self.end {
            params.push(("end", end.clone()));
        }
        params
    }
}

/// List endpoints answer with an array, or a bare object when filtered down
/// to a single record.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// HTTP client for the inferex control plane
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    request_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .user_agent(user_agent())
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);
        let builder = self.http.request(method, url).timeout(self.request_timeout);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, endpoint: &str, builder: RequestBuilder) -> Result<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| network_error(endpoint, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| network_error(endpoint, e))?;
        tracing::debug!("{} -> {}", endpoint, status);

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    /// `POST /login`; does not require a token.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let builder = self
            .request(Method::POST, "/login")
            .form(&[("username", username), ("password", password)]);
        let response: LoginResponse = self.send("/login", builder).await?;
        if response.access_token.trim().is_empty() {
            return Err(ApiError::InvalidResponse {
                endpoint: "/login".to_string(),
                reason: "empty access_token".to_string(),
            });
        }
        Ok(response)
    }

    pub async fn list_projects(&self, name: Option<&str>) -> Result<Vec<ProjectRecord>> {
        let mut builder = self.request(Method::GET, "/projects");
        if let Some(name) = name {
            builder = builder.query(&[("project_name", name)]);
        }
        let records: OneOrMany<ProjectRecord> = self.send("/projects", builder).await?;
        Ok(records.into())
    }

    pub async fn delete_project(&self, name: &str) -> Result<ProjectRecord> {
        let builder = self
            .request(Method::DELETE, "/projects")
            .query(&[("project_name", name)]);
        self.send("/projects", builder).await
    }

    pub async fn list_deployments(
        &self,
        git_sha: Option<&str>,
        project_name: Option<&str>,
    ) -> Result<Vec<DeploymentRecord>> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(sha) = git_sha {
            params.push(("git_sha", sha));
        }
        if let Some(project) = project_name {
            params.push(("project_name", project));
        }
        let builder = self.request(Method::GET, "/deployments").query(&params);
        let records: OneOrMany<DeploymentRecord> = self.send("/deployments", builder).await?;
        Ok(records.into())
    }

    pub async fn delete_deployment(&self, git_sha: &str) -> Result<DeploymentRecord> {
        let builder = self
            .request(Method::DELETE, "/deployments")
            .query(&[("git_sha", git_sha)]);
        self.send("/deployments", builder).await
    }

    pub async fn list_pipelines(&self, git_sha: &str) -> Result<Vec<PipelineRecord>> {
        let builder = self
            .request(Method::GET, "/pipelines")
            .query(&[("git_sha", git_sha)]);
        let records: OneOrMany<PipelineRecord> = self.send("/pipelines", builder).await?;
        Ok(records.into())
    }

    pub async fn logs(&self, query: &LogQuery) -> Result<LogStreams> {
        let builder = self.request(Method::GET, "/logs").query(&query.params());
        let value: serde_json::Value = self.send("/logs", builder).await?;
        parse_log_streams(value)
    }
}

#[async_trait]
impl DeploymentApi for ApiClient {
    async fn create_project(&self, name: &str) -> Result<ProjectRecord> {
        let builder = self
            .request(Method::POST, "/projects")
            .query(&[("project_name", name)]);
        self.send("/projects", builder).await
    }

    async fn upload_deployment(&self, request: UploadRequest<'_>) -> Result<UploadReceipt> {
        let file_name = format!("{}.tar.gz", request.git_sha);
        let part = Part::bytes(request.archive)
            .file_name(file_name)
            .mime_str(ARCHIVE_MIME)
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let form = Form::new().part("file", part);

        let stream = if request.stream { "true" } else { "false" };
        let builder = self
            .request(Method::POST, "/deployments")
            .query(&[
                ("project_name", request.project_name),
                ("git_commit_sha", request.git_sha),
                ("stream", stream),
            ])
            .timeout(self.request_timeout.max(UPLOAD_TIMEOUT))
            .multipart(form);
        self.send("/deployments", builder).await
    }

    async fn deployment_status(&self, task_id: &str) -> Result<StatusReport> {
        let builder = self
            .request(Method::GET, "/deployments/status")
            .query(&[("task_id", task_id)]);
        self.send("/deployments/status", builder).await
    }
}

fn network_error(endpoint: &str, err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Network(format!("{} did not respond in time", endpoint))
    } else {
        ApiError::Network(err.to_string())
    }
}

/// Map a non-2xx response onto the error taxonomy.
pub fn classify_failure(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message())
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("no detail provided")
                .to_string()
        });

    let code = status.as_u16();
    match code {
        401 => ApiError::Auth(message),
        400..=499 => ApiError::Validation {
            status: code,
            message,
        },
        _ => ApiError::Server {
            status: code,
            message,
        },
    }
}

/// The logs endpoint reports query problems inside a 200 body.
fn parse_log_streams(value: serde_json::Value) -> Result<LogStreams> {
    if let Some(object) = value.as_object() {
        for key in ["error", "errors"] {
            if let Some(err) = object.get(key) {
                let message = match err {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                return Err(ApiError::Validation {
                    status: 200,
                    message,
                });
            }
        }
    }
    serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse {
        endpoint: "/logs".to_string(),
        reason: e.to_string(),
    })
}
