use std::path::PathBuf;
use std::time::Duration;

use super::credentials::CREDENTIAL_FILE_NAME;
use super::error::{ConfigError, Result};
use crate::api::{DEFAULT_REQUEST_TIMEOUT, PollPolicy};
use crate::paths;

pub const DEFAULT_API_ROOT: &str = "https://api.inferex.com";

pub const API_ENV: &str = "INFEREX_API";
pub const TOKEN_ENV: &str = "INFEREX_TOKEN";
pub const POLL_INTERVAL_ENV: &str = "INFEREX_POLL_INTERVAL_SECS";
pub const POLL_ATTEMPTS_ENV: &str = "INFEREX_POLL_ATTEMPTS";
pub const REQUEST_TIMEOUT_ENV: &str = "INFEREX_REQUEST_TIMEOUT_SECS";

/// Resolved runtime settings, built once in the CLI and passed down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_root: String,
    pub home_dir: PathBuf,
    pub token_override: Option<String>,
    pub poll: PollPolicy,
    pub request_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_root = match non_empty(API_ENV) {
            Some(raw) => normalize_api_root(&raw)?,
            None => DEFAULT_API_ROOT.to_string(),
        };

        let home_dir = paths::home_dir_from(lookup(paths::HOME_ENV)).map_err(|e| {
            ConfigError::InvalidSetting {
                name: paths::HOME_ENV.to_string(),
                reason: e.to_string(),
            }
        })?;

        let token_override = non_empty(TOKEN_ENV).map(|t| t.trim().to_string());

        let mut poll = PollPolicy::default();
        if let Some(raw) = non_empty(POLL_INTERVAL_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidSetting {
                name: POLL_INTERVAL_ENV.to_string(),
                reason: format!("'{}' is not a number of seconds", raw),
            })?;
            poll.interval = Duration::from_secs(secs);
        }
        if let Some(raw) = non_empty(POLL_ATTEMPTS_ENV) {
            let attempts: u32 = raw
                .trim()
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidSetting {
                    name: POLL_ATTEMPTS_ENV.to_string(),
                    reason: format!("'{}' is not a positive number", raw),
                })?;
            poll.max_attempts = attempts;
        }

        let mut request_timeout = DEFAULT_REQUEST_TIMEOUT;
        if let Some(raw) = non_empty(REQUEST_TIMEOUT_ENV) {
            let secs: u64 = raw
                .trim()
                .parse()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidSetting {
                    name: REQUEST_TIMEOUT_ENV.to_string(),
                    reason: format!("'{}' is not a positive number of seconds", raw),
                })?;
            request_timeout = Duration::from_secs(secs);
        }

        Ok(Self {
            api_root,
            home_dir,
            token_override,
            poll,
            request_timeout,
        })
    }

    /// A `--token` flag beats `INFEREX_TOKEN`.
    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.map(|t| t.trim().to_string())
            && !token.is_empty()
        {
            self.token_override = Some(token);
        }
        self
    }

    pub fn credential_path(&self) -> PathBuf {
        self.home_dir.join(CREDENTIAL_FILE_NAME)
    }
}

fn normalize_api_root(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidSetting {
            name: API_ENV.to_string(),
            reason: format!("'{}' must start with http:// or https://", raw),
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let s = settings(&[(paths::HOME_ENV, "/tmp/inferex-home")]).unwrap();
        assert_eq!(s.api_root, DEFAULT_API_ROOT);
        assert_eq!(s.home_dir, PathBuf::from("/tmp/inferex-home"));
        assert_eq!(s.credential_path(), PathBuf::from("/tmp/inferex-home/token.json"));
        assert!(s.token_override.is_none());
        assert_eq!(s.poll, PollPolicy::default());
        assert_eq!(s.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn api_root_override_drops_trailing_slash() {
        let s = settings(&[(API_ENV, "http://127.0.0.1:9000/")]).unwrap();
        assert_eq!(s.api_root, "http://127.0.0.1:9000");
    }

    #[test]
    fn api_root_without_scheme_is_rejected() {
        let err = settings(&[(API_ENV, "api.inferex.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { .. }));
    }

    #[test]
    fn poll_policy_comes_from_environment() {
        let s = settings(&[(POLL_INTERVAL_ENV, "0"), (POLL_ATTEMPTS_ENV, "3")]).unwrap();
        assert_eq!(s.poll.interval, Duration::ZERO);
        assert_eq!(s.poll.max_attempts, 3);

        assert!(settings(&[(POLL_ATTEMPTS_ENV, "0")]).is_err());
        assert!(settings(&[(POLL_INTERVAL_ENV, "soon")]).is_err());
    }

    #[test]
    fn request_timeout_comes_from_environment() {
        let s = settings(&[(REQUEST_TIMEOUT_ENV, "5")]).unwrap();
        assert_eq!(s.request_timeout, Duration::from_secs(5));

        assert!(settings(&[(REQUEST_TIMEOUT_ENV, "0")]).is_err());
        assert!(settings(&[(REQUEST_TIMEOUT_ENV, "never")]).is_err());
    }

    #[test]
    fn token_flag_beats_environment() {
        let s = settings(&[(TOKEN_ENV, "from-env")]).unwrap();
        assert_eq!(s.token_override.as_deref(), Some("from-env"));

        let s = s.with_token_override(Some("from-flag".to_string()));
        assert_eq!(s.token_override.as_deref(), Some("from-flag"));

        let s = s.with_token_override(Some("  ".to_string()));
        assert_eq!(s.token_override.as_deref(), Some("from-flag"));
    }
}
