use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while packaging a project
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Project directory {0} does not exist")]
    MissingProject(PathBuf),

    #[error("{0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("{0} is empty (or everything in it is ignored), please add files to it")]
    EmptyProject(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid .ixignore pattern '{pattern}': {reason}")]
    IgnorePattern { pattern: String, reason: String },

    #[error("Failed to create archive: {0}")]
    ArchiveError(String),

    #[error("Could not gather randomness: {0}")]
    Entropy(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
