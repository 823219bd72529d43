//! # Notary
//!
//! Signs Views and query descriptors with a driver's key.

use crate::domain::TrustedKey;
use shared_crypto::{CryptoError, Ed25519KeyPair, Secp256k1KeyPair};
use shared_types::{Notarization, Query, SignatureScheme, View};

/// Signing key of a notary.
pub enum NotaryKey {
    /// Ed25519 key.
    Ed25519(Ed25519KeyPair),
    /// secp256k1 key.
    Secp256k1(Secp256k1KeyPair),
}

impl NotaryKey {
    /// Ed25519 key from a 32-byte seed.
    pub fn ed25519_from_seed(seed: [u8; 32]) -> Self {
        Self::Ed25519(Ed25519KeyPair::from_seed(seed))
    }

    /// secp256k1 key from 32 secret bytes.
    pub fn secp256k1_from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        Ok(Self::Secp256k1(Secp256k1KeyPair::from_bytes(bytes)?))
    }

    /// Key of either scheme from a 32-byte seed.
    pub fn from_seed(scheme: SignatureScheme, seed: [u8; 32]) -> Result<Self, CryptoError> {
        match scheme {
            SignatureScheme::Ed25519 => Ok(Self::ed25519_from_seed(seed)),
            SignatureScheme::Secp256k1 => Self::secp256k1_from_bytes(seed),
        }
    }

    /// Fresh random key.
    pub fn generate(scheme: SignatureScheme) -> Self {
        match scheme {
            SignatureScheme::Ed25519 => Self::Ed25519(Ed25519KeyPair::generate()),
            SignatureScheme::Secp256k1 => Self::Secp256k1(Secp256k1KeyPair::generate()),
        }
    }

    /// Scheme of this key.
    pub fn scheme(&self) -> SignatureScheme {
        match self {
            Self::Ed25519(_) => SignatureScheme::Ed25519,
            Self::Secp256k1(_) => SignatureScheme::Secp256k1,
        }
    }

    /// Public key bytes.
    pub fn public_key(&self) -> Vec<u8> {
        match self {
            Self::Ed25519(kp) => kp.public_key().as_bytes().to_vec(),
            Self::Secp256k1(kp) => kp.public_key().as_bytes().to_vec(),
        }
    }

    fn sign(&self, message: &[u8]) -> Vec<u8> {
        match self {
            Self::Ed25519(kp) => kp.sign(message).as_bytes().to_vec(),
            Self::Secp256k1(kp) => kp.sign(message).as_bytes().to_vec(),
        }
    }
}

/// A named signer.
pub struct Notary {
    signer_id: String,
    key: NotaryKey,
}

impl Notary {
    /// Create a notary.
    pub fn new(signer_id: impl Into<String>, key: NotaryKey) -> Self {
        Self {
            signer_id: signer_id.into(),
            key,
        }
    }

    /// Signer name.
    pub fn signer_id(&self) -> &str {
        &self.signer_id
    }

    /// The entry a peer adds to its trust anchor to accept this notary.
    pub fn trusted_key(&self) -> TrustedKey {
        TrustedKey {
            signer_id: self.signer_id.clone(),
            scheme: self.key.scheme(),
            public_key: self.key.public_key(),
        }
    }

    /// Append this notary's attestation to `view`.
    pub fn notarize(&self, view: &mut View) {
        let signature = self.key.sign(&view.signing_digest());
        view.payload.notarizations.push(Notarization {
            signer_id: self.signer_id.clone(),
            scheme: self.key.scheme(),
            public_key: self.key.public_key(),
            signature,
        });
    }

    /// Sign `query` in place, attaching the public key as certificate.
    pub fn sign_query(&self, query: &mut Query) {
        query.signature = Some(self.key.sign(&query.signing_digest()));
        query.certificate = Some(self.key.public_key());
    }
}

impl std::fmt::Debug for Notary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notary")
            .field("signer_id", &self.signer_id)
            .field("scheme", &self.key.scheme())
            .finish_non_exhaustive()
    }
}
