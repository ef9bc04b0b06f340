//! API Key generation
//!
//! Keys are 32 random bytes in URL-safe base64. Only their SHA-256 hex
//! digest is ever persisted.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

const KEY_BYTES: usize = 32;

/// A freshly minted key and the digest stored in its place
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    pub key: String,
    pub hash: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiKeyGenerator;

impl ApiKeyGenerator {
    pub fn generate(&self) -> GeneratedApiKey {
        let mut random_bytes = [0u8; KEY_BYTES];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        let key = URL_SAFE_NO_PAD.encode(random_bytes);
        let hash = Self::hash_key(&key);

        GeneratedApiKey { key, hash }
    }

    /// Lowercase hex SHA-256 of the plaintext
    pub fn hash_key(key: &str) -> String {
        hex::encode(Sha256::digest(key.as_bytes()))
    }
}
