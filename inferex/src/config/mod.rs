mod credentials;
mod error;
mod manifest;
mod settings;

pub use credentials::{CREDENTIAL_FILE_NAME, Credential, CredentialError, CredentialStore};
pub use error::*;
pub use manifest::*;
pub use settings::*;
