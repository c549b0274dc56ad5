use sha2::{Digest, Sha256};

/// Hex characters kept from the SHA-256 digest
pub const FINGERPRINT_LEN: usize = 16;

/// Short content fingerprint. No normalisation: a whitespace change is a change.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(FINGERPRINT_LEN);
    hex
}
