//! # Adapters Layer (Hexagonal Architecture)
//!
//! Signature scheme verifiers and the signing side (`Notary`).

mod notary;
mod verifiers;

pub use notary::{Notary, NotaryKey};
pub use verifiers::{Ed25519Verifier, Secp256k1Verifier, VerifierSet};
