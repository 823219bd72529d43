//! # Inbound Ports
//!
//! API trait defining what the View/Proof Codec can do.

use crate::domain::DecodeError;
use shared_types::{Query, View};

/// View/Proof Codec API - inbound port.
pub trait ViewCodecApi: Send + Sync {
    /// Encode a View (including notarizations) into a framed envelope.
    fn encode(&self, view: &View) -> Result<Vec<u8>, DecodeError>;

    /// Decode a framed envelope and check its notarizations against the
    /// declared network's trust anchor.
    fn decode(&self, bytes: &[u8]) -> Result<View, DecodeError>;

    /// Decode a framed envelope without trust checks.
    fn decode_unverified(&self, bytes: &[u8]) -> Result<View, DecodeError>;

    /// Check an already-decoded View against its trust anchor.
    fn verify(&self, view: &View) -> Result<(), DecodeError>;

    /// Check a signed query's signature against the anchor of
    /// `signer_network`, the network of the driver that signed it.
    fn verify_query(&self, query: &Query, signer_network: &str) -> bool;
}
