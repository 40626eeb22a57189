use thiserror::Error;

use crate::api::ApiError;
use crate::app::ProjectNameError;
use crate::build::BuildError;
use crate::config::{ConfigError, CredentialError};

/// Every failure a command can surface
#[derive(Debug, Error)]
pub enum InferexError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    ProjectName(#[from] ProjectNameError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Deployment {sha} failed: {reason}")]
    DeployFailed { sha: String, reason: String },

    #[error("{0}")]
    Usage(String),

    #[error("{count} of {total} deletions failed")]
    PartialFailure { count: usize, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, InferexError>;

/// Coarse error classes used for reporting and in tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Schema,
    NotFound,
    NotAuthenticated,
    Auth,
    Validation,
    Server,
    Network,
    Io,
    Timeout,
    DeployFailed,
    Usage,
}

impl InferexError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InferexError::Config(e) => match e {
                ConfigError::NotFound(_) => ErrorKind::NotFound,
                ConfigError::FileRead(..) | ConfigError::FileWrite(..) => ErrorKind::Io,
                ConfigError::YamlParse(_) | ConfigError::Schema(_) => ErrorKind::Schema,
                ConfigError::InvalidSetting { .. } | ConfigError::AlreadyExists(_) => {
                    ErrorKind::Usage
                }
            },
            InferexError::Credentials(e) => match e {
                CredentialError::NotAuthenticated(_) => ErrorKind::NotAuthenticated,
                CredentialError::EmptyToken => ErrorKind::Validation,
                CredentialError::FileRead(..)
                | CredentialError::FileWrite(..)
                | CredentialError::Serialize(_) => ErrorKind::Io,
            },
            InferexError::ProjectName(_) => ErrorKind::Validation,
            InferexError::Build(e) => match e {
                BuildError::MissingProject(_) => ErrorKind::NotFound,
                BuildError::IgnorePattern { .. } => ErrorKind::Schema,
                BuildError::NotADirectory(_) | BuildError::EmptyProject(_) => ErrorKind::Usage,
                BuildError::Read { .. }
                | BuildError::ArchiveError(_)
                | BuildError::Entropy(_)
                | BuildError::Io(_) => ErrorKind::Io,
            },
            InferexError::Api(e) => match e {
                ApiError::Auth(_) => ErrorKind::Auth,
                ApiError::Validation { .. } => ErrorKind::Validation,
                ApiError::Server { .. } | ApiError::InvalidResponse { .. } => ErrorKind::Server,
                ApiError::Network(_) => ErrorKind::Network,
                ApiError::Timeout { .. } => ErrorKind::Timeout,
            },
            InferexError::DeployFailed { .. } => ErrorKind::DeployFailed,
            InferexError::Usage(_) => ErrorKind::Usage,
            InferexError::PartialFailure { .. } => ErrorKind::Server,
            InferexError::Io(_) => ErrorKind::Io,
        }
    }

    /// Process exit code; clap handles usage errors (2) before we get here.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
