//! Content fingerprint: the identity key for exact-duplicate detection.

use sha2::{Digest, Sha256};

/// SHA-256 over the identity tuple, hex-encoded. The same tuple always
/// yields the same fingerprint; any component change yields a new one. A
/// missing GUID contributes the empty string so presence and absence hash
/// differently from an empty value only by convention of the separator.
pub fn content_fingerprint(
    source_id: &str,
    canonical_url: &str,
    guid: Option<&str>,
    title: &str,
) -> String {
    let material = format!(
        "{source_id}::{canonical_url}::{guid}::{title}",
        guid = guid.unwrap_or("")
    );
    hex::encode(Sha256::digest(material.as_bytes()))
}
