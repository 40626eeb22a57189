//! Project packaging
//!
//! Handles:
//! - Default and `.ixignore` exclusions
//! - Deterministic tar.gz archives with a content hash
//! - Deployment SHAs derived from that hash

mod archive;
mod error;
mod exclude;
mod sha;

pub use archive::*;
pub use error::*;
pub use exclude::*;
pub use sha::*;
