//! Inferex Core - Shared wire types
//!
//! This crate contains the records exchanged between the Inferex CLI
//! (`inferex`) and the Inferex control plane over HTTPS, plus the deploy
//! phase state machine the CLI walks through while submitting a project.
//!
//! All CLI-specific functionality (archiving, credentials, HTTP transport,
//! terminal output) lives in the `inferex` crate.

mod phase;
mod protocol;

pub use phase::*;
pub use protocol::*;
