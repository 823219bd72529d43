//! # IX-01 View/Proof Codec
//!
//! Encodes Views into a transport-neutral framed envelope and decides
//! whether a decoded View is backed by enough trusted notarizations.
//!
//! **Component ID:** 1
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Wire Frame
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 4 | magic `IXVW` |
//! | 4 | 2 | codec version (big-endian) |
//! | 6 | 4 | body length (big-endian) |
//! | 10 | n | bincode(View) |
//!
//! ## Trust Policy
//!
//! Each network has a trust anchor: accepted signer keys plus a threshold
//! `k`. A View decodes only if at least `k` distinct trusted signers produced
//! a valid signature over `View::signing_digest`. A bad signature from a
//! trusted key rejects the View outright.
//!
//! ## Module Structure
//!
//! ```text
//! ix-01-view-proof/
//! ├── domain/          # DecodeError, TrustAnchor, TrustStore
//! ├── algorithms/      # framing, notarization threshold checks
//! ├── ports/           # ViewCodecApi, SignatureVerifier
//! ├── adapters/        # Ed25519/secp256k1 verifiers, Notary
//! └── service.rs       # ViewCodec
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{Ed25519Verifier, Notary, NotaryKey, Secp256k1Verifier, VerifierSet};
pub use algorithms::{decode_frame, encode_frame, verify_notarizations, verify_query_signature};
pub use algorithms::{CODEC_VERSION, DEFAULT_MAX_VIEW_BYTES, FRAME_HEADER_LEN, VIEW_MAGIC};
pub use domain::{DecodeError, TrustAnchor, TrustStore, TrustedKey};
pub use ports::{SignatureVerifier, ViewCodecApi};
pub use service::ViewCodec;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
