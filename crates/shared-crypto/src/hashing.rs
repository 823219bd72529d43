//! # Digests
//!
//! SHA-256 and BLAKE3. Ledgers agree on one of the two per hash lock;
//! SHA-256 is what EVM HTLC contracts check on-chain.

use sha2::{Digest, Sha256};

/// 256-bit digest output.
pub type Hash = [u8; 32];

/// Stateful BLAKE3 hasher.
pub struct Blake3Hasher {
    inner: blake3::Hasher,
}

impl Blake3Hasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self {
            inner: blake3::Hasher::new(),
        }
    }

    /// Update with data.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.inner.update(data);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(&self) -> Hash {
        *self.inner.finalize().as_bytes()
    }
}

impl Default for Blake3Hasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash data with BLAKE3 (one-shot).
pub fn blake3_hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Hash data with SHA-256 (one-shot).
pub fn sha256_hash(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}

/// Derive a 32-byte key from context and input key material.
///
/// Used to turn a configured driver secret into a signing seed.
pub fn blake3_derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    *hasher.finalize().as_bytes()
}
