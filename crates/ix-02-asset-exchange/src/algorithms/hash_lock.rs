//! # Hash Lock
//!
//! Preimage generation and verification for HTLC-style locks. The digest
//! function is whatever the two ledgers agreed on in the lock terms.

use crate::domain::{AssetExchangeError, Preimage};
use rand::RngCore;
use shared_crypto::{blake3_hash, sha256_hash};
use shared_types::{DigestAlgorithm, Hash, LockTerms, SessionId};

/// Generate a random 32-byte preimage.
pub fn generate_preimage() -> Preimage {
    let mut bytes = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    Preimage::new(bytes)
}

/// Create a hash lock from a preimage.
pub fn create_hash_lock(digest: DigestAlgorithm, preimage: &[u8]) -> Hash {
    match digest {
        DigestAlgorithm::Sha256 => sha256_hash(preimage),
        DigestAlgorithm::Blake3 => blake3_hash(preimage),
    }
}

/// Verify that a preimage matches a hash lock.
pub fn verify_preimage(digest: DigestAlgorithm, preimage: &[u8], hash_lock: &Hash) -> bool {
    create_hash_lock(digest, preimage) == *hash_lock
}

/// Whether `deadline` has passed at `now`. The deadline second itself is
/// still inside the lock.
pub fn is_elapsed(now: u64, deadline: u64) -> bool {
    now > deadline
}

/// Verify a claim against the lock terms.
pub fn verify_claim(
    preimage: &Preimage,
    terms: &LockTerms,
    session_id: &SessionId,
    now: u64,
) -> Result<(), AssetExchangeError> {
    // 1. Deadline first: a late claim is expired even with a valid preimage
    if is_elapsed(now, terms.time_lock) {
        return Err(AssetExchangeError::Expired {
            session_id: session_id.clone(),
            time_lock: terms.time_lock,
        });
    }

    // 2. Preimage must hash to the lock
    if !verify_preimage(terms.digest, preimage.as_bytes(), &terms.hash_lock) {
        return Err(AssetExchangeError::InvalidPreimage);
    }

    Ok(())
}
