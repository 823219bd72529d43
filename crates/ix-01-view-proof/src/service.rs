//! # View Codec Service
//!
//! Implements `ViewCodecApi` over a shared `TrustStore` and a `VerifierSet`.

use crate::adapters::VerifierSet;
use crate::algorithms::{
    decode_frame, encode_frame, verify_notarizations, verify_query_signature,
    DEFAULT_MAX_VIEW_BYTES,
};
use crate::domain::{DecodeError, TrustStore};
use crate::ports::ViewCodecApi;
use shared_types::{Query, View};
use std::sync::Arc;
use tracing::{debug, warn};

/// The View/Proof Codec.
#[derive(Debug, Clone)]
pub struct ViewCodec {
    trust: Arc<TrustStore>,
    verifiers: VerifierSet,
    max_view_bytes: usize,
}

impl ViewCodec {
    /// Codec over `trust` with the standard verifiers.
    pub fn new(trust: Arc<TrustStore>) -> Self {
        Self {
            trust,
            verifiers: VerifierSet::standard(),
            max_view_bytes: DEFAULT_MAX_VIEW_BYTES,
        }
    }

    /// Replace the verifier table.
    pub fn with_verifiers(mut self, verifiers: VerifierSet) -> Self {
        self.verifiers = verifiers;
        self
    }

    /// Override the frame size limit.
    pub fn with_max_view_bytes(mut self, max_view_bytes: usize) -> Self {
        self.max_view_bytes = max_view_bytes;
        self
    }

    /// The trust store, for runtime anchor updates.
    pub fn trust_store(&self) -> &Arc<TrustStore> {
        &self.trust
    }
}

impl ViewCodecApi for ViewCodec {
    fn encode(&self, view: &View) -> Result<Vec<u8>, DecodeError> {
        encode_frame(view, self.max_view_bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<View, DecodeError> {
        let view = decode_frame(bytes, self.max_view_bytes)?;
        self.verify(&view)?;
        Ok(view)
    }

    fn decode_unverified(&self, bytes: &[u8]) -> Result<View, DecodeError> {
        decode_frame(bytes, self.max_view_bytes)
    }

    fn verify(&self, view: &View) -> Result<(), DecodeError> {
        let network = &view.meta.network_id;
        let anchor = self.trust.get(network).ok_or_else(|| {
            warn!("[ix-01] No trust anchor for network {}", network);
            DecodeError::untrusted(network, "no trust anchor")
        })?;

        let signers = verify_notarizations(view, &anchor, &self.verifiers).inspect_err(|e| {
            warn!("[ix-01] Rejected view for tx {}: {}", view.contract_context.tx_id, e);
        })?;

        debug!(
            "[ix-01] View for tx {} on {} accepted with {}/{} signers",
            view.contract_context.tx_id, network, signers, anchor.threshold
        );
        Ok(())
    }

    fn verify_query(&self, query: &Query, signer_network: &str) -> bool {
        let Some(anchor) = self.trust.get(signer_network) else {
            warn!(
                "[ix-01] No trust anchor for network {} to check query {}",
                signer_network, query.request_id
            );
            return false;
        };
        verify_query_signature(query, &anchor, &self.verifiers)
    }
}
