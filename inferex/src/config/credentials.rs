use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use time::OffsetDateTime;

use super::Settings;

pub const CREDENTIAL_FILE_NAME: &str = "token.json";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Not logged in (no usable token at {0}). Run 'inferex login' first.")]
    NotAuthenticated(PathBuf),

    #[error("Failed to read credentials {0}: {1}")]
    FileRead(PathBuf, std::io::Error),

    #[error("Failed to write credentials {0}: {1}")]
    FileWrite(PathBuf, std::io::Error),

    #[error("Failed to serialize credentials: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Refusing to store an empty token")]
    EmptyToken,
}

pub type Result<T> = std::result::Result<T, CredentialError>;

/// Stored API token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,

    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            issued_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Reads and writes the credential file at one fixed path.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(CREDENTIAL_FILE_NAME))
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.credential_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a token with owner-only permissions.
    pub fn save(&self, access_token: &str) -> Result<Credential> {
        let access_token = access_token.trim();
        if access_token.is_empty() {
            return Err(CredentialError::EmptyToken);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CredentialError::FileWrite(parent.to_path_buf(), e))?;
        }

        let credential = Credential::new(access_token);
        let content = serde_json::to_string_pretty(&credential)?;
        let write_err = |e: std::io::Error| CredentialError::FileWrite(self.path.clone(), e);

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path).map_err(write_err)?;

        // `mode` only applies on creation; tighten a file left by an older login.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(write_err)?;
        }
        file.write_all(content.as_bytes()).map_err(write_err)?;

        tracing::debug!("Saved credentials to {}", self.path.display());
        Ok(credential)
    }

    /// Load the stored token.
    ///
    /// A missing file, unreadable JSON or an empty token all mean the user is
    /// not authenticated.
    pub fn load(&self) -> Result<Credential> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CredentialError::NotAuthenticated(self.path.clone()));
            }
            Err(e) => return Err(CredentialError::FileRead(self.path.clone(), e)),
        };

        let credential: Credential = match serde_json::from_str(&content) {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable credentials at {}: {}",
                    self.path.display(),
                    e
                );
                return Err(CredentialError::NotAuthenticated(self.path.clone()));
            }
        };

        if credential.access_token.trim().is_empty() {
            return Err(CredentialError::NotAuthenticated(self.path.clone()));
        }

        Ok(credential)
    }

    /// Delete the credential file. Returns whether a file was removed.
    pub fn reset(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Removed credentials at {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CredentialError::FileWrite(self.path.clone(), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_then_load_returns_same_token() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(temp.path().join("nested"));

        let saved = store.save("  tok-123\n").unwrap();
        assert_eq!(saved.access_token, "tok-123");

        let loaded = store.load().unwrap();
        assert_eq!(loaded.access_token, "tok-123");
        assert_eq!(loaded.issued_at.unix_timestamp(), saved.issued_at.unix_timestamp());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(temp.path());
        store.save("tok").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn overwriting_readable_file_tightens_it() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(temp.path());
        fs::write(store.path(), r#"{"access_token":"old"}"#).unwrap();
        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();

        store.save("new").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap().access_token, "new");
    }

    #[test]
    fn load_without_file_is_not_authenticated() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(temp.path());
        assert!(matches!(
            store.load(),
            Err(CredentialError::NotAuthenticated(_))
        ));
    }

    #[test]
    fn corrupt_or_empty_token_is_not_authenticated() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(temp.path());

        fs::write(store.path(), "not json").unwrap();
        assert!(matches!(
            store.load(),
            Err(CredentialError::NotAuthenticated(_))
        ));

        fs::write(
            store.path(),
            r#"{"access_token":"  ","issued_at":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(matches!(
            store.load(),
            Err(CredentialError::NotAuthenticated(_))
        ));
    }

    #[test]
    fn empty_token_is_never_written() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(temp.path());
        assert!(matches!(store.save(""), Err(CredentialError::EmptyToken)));
        assert!(!store.path().exists());
    }

    #[test]
    fn reset_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(temp.path());
        store.save("tok").unwrap();

        assert!(store.reset().unwrap());
        assert!(!store.reset().unwrap());
        assert!(matches!(
            store.load(),
            Err(CredentialError::NotAuthenticated(_))
        ));
    }
}
