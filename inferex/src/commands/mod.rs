pub mod delete;
pub mod deploy;
pub mod display;
pub mod get;
pub mod init;
pub mod login;
pub mod logs;
pub mod reset;

use std::sync::OnceLock;

use time::UtcOffset;

use crate::api::ApiClient;
use crate::config::{CredentialError, CredentialStore, Settings};
use crate::error::Result;

static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// Each command runs its requests sequentially on one thread.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// Token from `--token`/`INFEREX_TOKEN`, else the credential file.
pub(crate) fn resolve_token(settings: &Settings) -> std::result::Result<String, CredentialError> {
    if let Some(token) = &settings.token_override {
        tracing::debug!("Using token override");
        return Ok(token.clone());
    }
    CredentialStore::from_settings(settings)
        .load()
        .map(|credential| credential.access_token)
}

/// Client for an authenticated call; fails before any request without a token.
pub(crate) fn authenticated_client(settings: &Settings) -> Result<ApiClient> {
    let token = resolve_token(settings)?;
    Ok(ApiClient::new(settings.api_root.clone(), Some(token))?
        .with_request_timeout(settings.request_timeout))
}

pub(crate) fn local_offset() -> UtcOffset {
    *LOCAL_OFFSET.get_or_init(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}
