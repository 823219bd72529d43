//! Ed25519 and secp256k1 verifiers backed by `shared-crypto`.

use crate::ports::SignatureVerifier;
use shared_crypto::{
    CryptoError, Ed25519PublicKey, Ed25519Signature, Secp256k1PublicKey, Secp256k1Signature,
};
use shared_types::SignatureScheme;
use std::collections::HashMap;
use std::sync::Arc;

/// Ed25519 verifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::Ed25519
    }

    fn verify(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError> {
        let key = Ed25519PublicKey::from_slice(public_key)?;
        let sig = Ed25519Signature::from_slice(signature)?;
        key.verify(message, &sig)
    }
}

/// secp256k1 ECDSA verifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct Secp256k1Verifier;

impl SignatureVerifier for Secp256k1Verifier {
    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::Secp256k1
    }

    fn verify(
        &self,
        public_key: &[u8],
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError> {
        let key = Secp256k1PublicKey::from_slice(public_key)?;
        let sig = Secp256k1Signature::from_slice(signature)?;
        key.verify(message, &sig)
    }
}

/// Scheme → verifier table.
#[derive(Clone, Default)]
pub struct VerifierSet {
    verifiers: HashMap<SignatureScheme, Arc<dyn SignatureVerifier>>,
}

impl VerifierSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ed25519 and secp256k1.
    pub fn standard() -> Self {
        Self::new()
            .with(Arc::new(Ed25519Verifier))
            .with(Arc::new(Secp256k1Verifier))
    }

    /// Register (or replace) the verifier for its scheme.
    pub fn with(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifiers.insert(verifier.scheme(), verifier);
        self
    }

    /// Verifier for a scheme.
    pub fn get(&self, scheme: SignatureScheme) -> Option<&Arc<dyn SignatureVerifier>> {
        self.verifiers.get(&scheme)
    }
}

impl std::fmt::Debug for VerifierSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.verifiers.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::{Ed25519KeyPair, Secp256k1KeyPair};

    #[test]
    fn test_ed25519_verifier() {
        let kp = Ed25519KeyPair::generate();
        let sig = kp.sign(b"digest");
        let v = Ed25519Verifier;
        assert!(v.verify(kp.public_key().as_bytes(), b"digest", sig.as_bytes()).is_ok());
        assert!(v.verify(kp.public_key().as_bytes(), b"other", sig.as_bytes()).is_err());
        assert!(v.verify(&[0u8; 5], b"digest", sig.as_bytes()).is_err());
    }

    #[test]
    fn test_secp256k1_verifier() {
        let kp = Secp256k1KeyPair::generate();
        let sig = kp.sign(b"digest");
        let v = Secp256k1Verifier;
        assert!(v.verify(kp.public_key().as_bytes(), b"digest", sig.as_bytes()).is_ok());
        assert!(v.verify(kp.public_key().as_bytes(), b"digest", &[0u8; 64]).is_err());
    }

    #[test]
    fn test_standard_set() {
        let set = VerifierSet::standard();
        assert!(set.get(SignatureScheme::Ed25519).is_some());
        assert!(set.get(SignatureScheme::Secp256k1).is_some());
        assert!(VerifierSet::new().get(SignatureScheme::Ed25519).is_none());
    }
}
