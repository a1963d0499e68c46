//! Cache key generation using truncated SHA-256 hashes

use sha2::{Digest, Sha256};

use crate::client::QueryParams;

/// File extension of every cache entry (gzip-compressed JSON)
pub const CACHE_EXTENSION: &str = "json.gz";

/// Number of hash bytes kept in a key (128 bits)
const DIGEST_BYTES: usize = 16;

/// Generate a deterministic cache key from a prefix and query parameters.
///
/// Null parameters are dropped and the rest are sorted by name before
/// hashing, so parameter order and explicit nulls never change the key.
/// The result is a file name: `{prefix}_{hash}.json.gz`.
pub fn cache_key(prefix: &str, params: &QueryParams) -> String {
    let effective = params.effective();

    // BTreeMap serializes in key order
    let canonical = serde_json::to_vec(&effective).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    let digest = hasher.finalize();

    let hash: String = digest[..DIGEST_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();

    format!("{}_{}.{}", prefix, hash, CACHE_EXTENSION)
}
