//! Small helpers shared by the auth, upload and API layers.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

/// Generates a random value for the OAuth `state` parameter.
///
/// The value is 32 alphanumeric characters, drawn from the thread-local
/// random generator.
///
/// # Example
///
/// ```
/// let state = generate_state();
/// assert_eq!(state.len(), 32);
/// ```
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Computes a URL-safe digest of `data`, usable as a file name.
///
/// SHA-256 of the bytes, encoded as unpadded URL-safe base64 (43 characters).
///
/// # Arguments
///
/// * `data` - Bytes to hash
///
/// # Example
///
/// ```
/// let name = format!("{}.mp3", content_digest(&bytes));
/// ```
pub fn content_digest(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    URL_SAFE_NO_PAD.encode(hash)
}

/// Splits a comma separated list, trimming entries and skipping empty ones.
///
/// # Example
///
/// ```
/// assert_eq!(parse_id_list(Some("a, b,,c")), vec!["a", "b", "c"]);
/// assert!(parse_id_list(None).is_empty());
/// ```
pub fn parse_id_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
