use inferex_core::SHORT_SHA_LENGTH;

use super::BuildError;

const SUFFIX_LEN: usize = 3;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// First [`SHORT_SHA_LENGTH`] hex characters of a content hash.
pub fn short_sha(content_hash: &str) -> &str {
    let end = content_hash
        .char_indices()
        .nth(SHORT_SHA_LENGTH)
        .map(|(i, _)| i)
        .unwrap_or(content_hash.len());
    &content_hash[..end]
}

/// Deployment SHA for an archive.
///
/// With `randomize`, a `-xxx` suffix lets the same content be deployed again
/// without the server rejecting it as a duplicate.
pub fn deployment_sha(content_hash: &str, randomize: bool) -> Result<String, BuildError> {
    let short = short_sha(content_hash);
    if !randomize {
        return Ok(short.to_string());
    }

    let mut bytes = [0u8; SUFFIX_LEN];
    getrandom::fill(&mut bytes).map_err(|e| BuildError::Entropy(e.to_string()))?;
    let suffix: String = bytes
        .iter()
        .map(|b| SUFFIX_ALPHABET[*b as usize % SUFFIX_ALPHABET.len()] as char)
        .collect();
    Ok(format!("{}-{}", short, suffix))
}
