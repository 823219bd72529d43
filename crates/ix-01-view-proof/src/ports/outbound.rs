//! # Outbound Ports
//!
//! One verifier per signature scheme, so networks can plug in the scheme
//! their ledger signs with.

use shared_crypto::CryptoError;
use shared_types::SignatureScheme;

/// Signature scheme plug-in - outbound port.
pub trait SignatureVerifier: Send + Sync {
    /// Scheme this verifier handles.
    fn scheme(&self) -> SignatureScheme;

    /// Verify `signature` by `public_key` over `message`.
    fn verify(&self, public_key: &[u8], message: &[u8], signature: &[u8])
        -> Result<(), CryptoError>;
}
