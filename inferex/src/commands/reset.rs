use crate::config::{CredentialStore, Settings};
use crate::error::Result;
use crate::output;

pub fn run(settings: &Settings) -> Result<()> {
    let store = CredentialStore::from_settings(settings);
    if store.reset()? {
        output::success(&format!("Removed {}", store.path().display()));
    } else {
        output::muted("No stored credentials, nothing to remove.");
    }
    if settings.token_override.is_some() {
        output::warning("INFEREX_TOKEN is still set and will keep being used.");
    }
    Ok(())
}
