use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No inferex.yaml found at {0}")]
    NotFound(PathBuf),

    #[error("Failed to read file {0}: {1}")]
    FileRead(PathBuf, std::io::Error),

    #[error("Failed to write file {0}: {1}")]
    FileWrite(PathBuf, std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Invalid inferex.yaml:\n{0}")]
    Schema(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidSetting { name: String, reason: String },

    #[error("{0} already exists")]
    AlreadyExists(PathBuf),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
