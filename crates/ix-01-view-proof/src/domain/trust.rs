//! # Trust Anchors
//!
//! Per-network verification policy: which signer keys are accepted and how
//! many distinct signers must attest a View.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared_types::SignatureScheme;
use std::collections::HashMap;

/// A signer key accepted for a network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrustedKey {
    /// Organization or node name, for logs.
    pub signer_id: String,
    /// Key scheme.
    pub scheme: SignatureScheme,
    /// Raw public key bytes (hex in configuration).
    #[serde(with = "hex::serde")]
    pub public_key: Vec<u8>,
}

/// Verification policy for one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustAnchor {
    /// Network this anchor covers.
    pub network_id: String,
    /// Minimum number of distinct trusted signers.
    pub threshold: usize,
    /// Accepted keys.
    pub keys: Vec<TrustedKey>,
}

impl TrustAnchor {
    /// Create an anchor; a threshold of zero is raised to one.
    pub fn new(network_id: impl Into<String>, threshold: usize, keys: Vec<TrustedKey>) -> Self {
        Self {
            network_id: network_id.into(),
            threshold: threshold.max(1),
            keys,
        }
    }

    /// The trusted key matching `(scheme, public_key)`, if any.
    pub fn find_key(&self, scheme: SignatureScheme, public_key: &[u8]) -> Option<&TrustedKey> {
        self.keys
            .iter()
            .find(|k| k.scheme == scheme && k.public_key == public_key)
    }

    /// Whether the threshold is at least one and can be met at all.
    pub fn is_satisfiable(&self) -> bool {
        self.threshold >= 1 && self.threshold <= self.keys.len()
    }
}

/// Network id → trust anchor. Anchors may be replaced at runtime.
#[derive(Debug, Default)]
pub struct TrustStore {
    anchors: RwLock<HashMap<String, TrustAnchor>>,
}

impl TrustStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from a list of anchors.
    pub fn with_anchors(anchors: impl IntoIterator<Item = TrustAnchor>) -> Self {
        let store = Self::new();
        for anchor in anchors {
            store.insert(anchor);
        }
        store
    }

    /// Add or replace the anchor for its network.
    pub fn insert(&self, anchor: TrustAnchor) {
        self.anchors.write().insert(anchor.network_id.clone(), anchor);
    }

    /// Remove a network's anchor.
    pub fn remove(&self, network_id: &str) -> Option<TrustAnchor> {
        self.anchors.write().remove(network_id)
    }

    /// Snapshot of a network's anchor.
    pub fn get(&self, network_id: &str) -> Option<TrustAnchor> {
        self.anchors.read().get(network_id).cloned()
    }

    /// Number of networks with an anchor.
    pub fn len(&self) -> usize {
        self.anchors.read().len()
    }

    /// Whether no anchor is configured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
