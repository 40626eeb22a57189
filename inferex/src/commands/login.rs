use crate::api::ApiClient;
use crate::config::{Credential, CredentialStore, Settings};
use crate::error::{InferexError, Result};
use crate::output;

/// Reads the password from stdin instead of prompting.
pub const STDIN_MARKER: &str = "-";

pub fn run(settings: &Settings, username: Option<String>, password: Option<String>) -> Result<()> {
    let rt = super::runtime()?;
    rt.block_on(run_async(settings, username, password))
}

async fn run_async(
    settings: &Settings,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    output::section("Login");
    let credential = login_interactively(settings, username, password).await?;
    tracing::info!("Token issued at {}", credential.issued_at);
    output::success(&format!(
        "Logged in. Token stored at {}",
        CredentialStore::from_settings(settings).path().display()
    ));
    Ok(())
}

/// Resolve credentials, exchange them for a token and persist it.
///
/// Nothing is written unless the server accepts the credentials.
pub(crate) async fn login_interactively(
    settings: &Settings,
    username: Option<String>,
    password: Option<String>,
) -> Result<Credential> {
    let username = resolve_username(username)?;
    let password = resolve_password(password)?;

    let client = ApiClient::new(settings.api_root.clone(), None)?
        .with_request_timeout(settings.request_timeout);
    let spinner = output::spinner(format!("Logging in as {}...", username));
    let response = client.login(&username, &password).await;
    spinner.finish_and_clear();

    let response = response?;
    let store = CredentialStore::from_settings(settings);
    Ok(store.save(&response.access_token)?)
}

fn resolve_username(username: Option<String>) -> Result<String> {
    if let Some(username) = username.map(|u| u.trim().to_string())
        && !username.is_empty()
    {
        return Ok(username);
    }
    if !output::is_interactive() {
        return Err(InferexError::Usage(
            "Username required: pass --username or set INFEREX_USERNAME".to_string(),
        ));
    }
    Ok(output::prompt_input("Email", false, None)?
        .trim()
        .to_string())
}

fn resolve_password(password: Option<String>) -> Result<String> {
    match password.as_deref() {
        Some(STDIN_MARKER) => {
            let value = output::read_stdin_trimmed()?;
            if value.is_empty() {
                return Err(InferexError::Usage(
                    "No password received on stdin".to_string(),
                ));
            }
            Ok(value)
        }
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => {
            if !output::is_interactive() {
                return Err(InferexError::Usage(
                    "Password required: pass --password (or '-' for stdin) or set INFEREX_PASSWORD"
                        .to_string(),
                ));
            }
            Ok(output::prompt_password("Password", false)?)
        }
    }
}
