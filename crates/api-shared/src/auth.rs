//! Staff API keys.
//!
//! Every staff member authenticates with an opaque API key sent in the [`API_KEY_HEADER`]
//! header. Keys are shown once when issued; only their SHA-256 digest is stored.

use sha2::{Digest, Sha256};

/// Header carrying the staff member's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Generates a fresh API key (32 lowercase hex characters).
pub fn generate_api_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Returns the lowercase hex SHA-256 digest of `api_key`, the form persisted in storage.
pub fn hash_api_key(api_key: &str) -> String {
    hex::encode(Sha256::digest(api_key.trim().as_bytes()))
}
