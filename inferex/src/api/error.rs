use thiserror::Error;

/// Failures talking to the control plane
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}. Run 'inferex login' to refresh your token.")]
    Auth(String),

    #[error("Request rejected ({status}): {message}")]
    Validation { status: u16, message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("Deployment task {task_id} did not finish after {attempts} status checks")]
    Timeout { task_id: String, attempts: u32 },
}

pub type Result<T> = std::result::Result<T, ApiError>;
