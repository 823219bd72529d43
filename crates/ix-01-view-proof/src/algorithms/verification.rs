//! # Notarization Checks
//!
//! A View is trusted when at least `threshold` distinct keys from its
//! network's anchor signed `View::signing_digest`. Signatures from keys the
//! anchor does not list are ignored. A failing signature from a listed key
//! rejects the View.

use crate::adapters::VerifierSet;
use crate::domain::{DecodeError, TrustAnchor};
use shared_types::{Query, SignatureScheme, View};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Count distinct trusted signers of `view`; error unless the count meets
/// the anchor's threshold.
pub fn verify_notarizations(
    view: &View,
    anchor: &TrustAnchor,
    verifiers: &VerifierSet,
) -> Result<usize, DecodeError> {
    let network = view.meta.network_id.as_str();
    if anchor.network_id != network {
        return Err(DecodeError::untrusted(
            network,
            format!("anchor is for network {}", anchor.network_id),
        ));
    }

    let digest = view.signing_digest();
    let mut signers: HashSet<&[u8]> = HashSet::new();

    for notarization in &view.payload.notarizations {
        let Some(key) = anchor.find_key(notarization.scheme, &notarization.public_key) else {
            debug!(
                "[ix-01] Ignoring notarization by untrusted signer {} on {}",
                notarization.signer_id, network
            );
            continue;
        };

        let verifier = verifiers.get(notarization.scheme).ok_or_else(|| {
            DecodeError::untrusted(
                network,
                format!("no verifier for scheme {:?}", notarization.scheme),
            )
        })?;

        if let Err(e) = verifier.verify(&key.public_key, &digest, &notarization.signature) {
            warn!(
                "[ix-01] Invalid signature from trusted signer {} on {}: {}",
                key.signer_id, network, e
            );
            return Err(DecodeError::untrusted(
                network,
                format!("invalid signature from {}", key.signer_id),
            ));
        }

        signers.insert(key.public_key.as_slice());
    }

    // An anchor deserialized with threshold 0 still needs one signer.
    let required = anchor.threshold.max(1);
    if signers.len() < required {
        return Err(DecodeError::untrusted(
            network,
            format!(
                "{} of {} required trusted signatures",
                signers.len(),
                required
            ),
        ));
    }

    Ok(signers.len())
}

/// Check a query's signature. The embedded certificate must be a key the
/// signer network's anchor lists; the scheme is inferred from the key
/// length (32 = Ed25519, 33 = secp256k1).
pub fn verify_query_signature(
    query: &Query,
    anchor: &TrustAnchor,
    verifiers: &VerifierSet,
) -> bool {
    let (Some(signature), Some(certificate)) = (&query.signature, &query.certificate) else {
        return false;
    };
    let scheme = match certificate.len() {
        32 => SignatureScheme::Ed25519,
        33 => SignatureScheme::Secp256k1,
        _ => return false,
    };
    let Some(key) = anchor.find_key(scheme, certificate) else {
        debug!(
            "[ix-01] Query {} signed by a key {} does not trust",
            query.request_id, anchor.network_id
        );
        return false;
    };
    verifiers
        .get(scheme)
        .map(|v| {
            v.verify(&key.public_key, &query.signing_digest(), signature)
                .is_ok()
        })
        .unwrap_or(false)
}
