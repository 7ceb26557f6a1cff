//! Salted identifier hashing

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `salt || identifier`
///
/// Deterministic for a fixed salt, so the same email hashes identically in
/// every row and every run that shares the salt.
pub fn salted_hash(salt: &str, identifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(identifier.as_bytes());
    let result = hasher.finalize();
    format!("{result:x}")
}

/// Lowercase hex SHA-256 of `value`
pub fn digest(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}
