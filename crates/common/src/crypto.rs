//! Constant-time key hashing shared across crates that authenticate
//! opaque API keys.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Hash a freshly-minted key for storage. Returns `hex(salt):hex(hash)`.
pub fn hash_key(key: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher.update(salt);
    let hash = hasher.finalize();

    format!("{}:{}", hex::encode(salt), hex::encode(hash))
}

/// Verify an API key against a stored hash using constant-time comparison.
///
/// The stored hash format is `hex(salt):hex(sha256(key || salt))`.
pub fn verify_key_hash(candidate_key: &str, stored_hash: &str) -> bool {
    let parts: Vec<&str> = stored_hash.split(':').collect();
    if parts.len() != 2 {
        return false;
    }

    let salt = match hex::decode(parts[0]) {
        Ok(salt) => salt,
        Err(_) => return false,
    };
    let hash = match hex::decode(parts[1]) {
        Ok(hash) => hash,
        Err(_) => return false,
    };

    let mut hasher = Sha256::new();
    hasher.update(candidate_key.as_bytes());
    hasher.update(&salt);
    let candidate_hash = hasher.finalize();

    if hash.len() != candidate_hash.len() {
        return false;
    }

    let mut result = 0u8;
    for (a, b) in hash.iter().zip(candidate_hash.iter()) {
        result |= a ^ b;
    }
    result == 0
}
