//! # Preimage
//!
//! Wrapper for hash-lock preimages that zeroizes memory on drop.
//!
//! ## Security
//!
//! A preimage unlocks the asset on both ledgers. It is never printed, and
//! its bytes are wiped when the last copy is dropped.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Largest preimage accepted from a claimant.
pub const MAX_PREIMAGE_LEN: usize = 256;

/// A hash-lock preimage that zeroizes on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Preimage {
    inner: Vec<u8>,
}

impl Preimage {
    /// Wrap raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { inner: bytes }
    }

    /// Copy from a slice.
    pub fn from_slice(slice: &[u8]) -> Self {
        Self {
            inner: slice.to_vec(),
        }
    }

    /// Raw bytes. Use immediately and let go.
    pub fn as_bytes(&self) -> &[u8] {
        &self.inner
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the preimage is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl std::fmt::Debug for Preimage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Preimage(***)")
    }
}

impl Serialize for Preimage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex::encode(&self.inner))
    }
}

impl<'de> Deserialize<'de> for Preimage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        if bytes.len() > MAX_PREIMAGE_LEN {
            return Err(serde::de::Error::custom("preimage too long"));
        }
        Ok(Self::new(bytes))
    }
}
