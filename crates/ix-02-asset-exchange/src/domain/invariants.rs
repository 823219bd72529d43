//! # Domain Invariants
//!
//! Business rules checked before a transition or a connector call.

use super::entities::Session;
use super::errors::AssetExchangeError;
use shared_types::{Counterparty, DriverId, LedgerRef, LockTerms, SessionState};

/// Invariant: terminal states are absorbing.
pub fn invariant_not_terminal(session: &Session, to: SessionState) -> Result<(), AssetExchangeError> {
    if session.state.is_terminal() {
        return Err(AssetExchangeError::InvalidTransition {
            from: session.state,
            to,
        });
    }
    Ok(())
}

/// Invariant: lock terms are present and leave at least `min_ttl_secs`
/// before the deadline.
pub fn invariant_lock_terms(
    terms: &LockTerms,
    now: u64,
    min_ttl_secs: u64,
) -> Result<(), AssetExchangeError> {
    if terms.time_lock < now.saturating_add(min_ttl_secs) {
        return Err(AssetExchangeError::InvalidLockTerms(format!(
            "time lock {} is less than {}s after {}",
            terms.time_lock, min_ttl_secs, now
        )));
    }
    if terms.asset.asset_id.is_empty() {
        return Err(AssetExchangeError::InvalidLockTerms(
            "empty asset id".to_string(),
        ));
    }
    Ok(())
}

/// Invariant: a session keeps the lock terms it was opened with.
pub fn invariant_terms_unchanged(
    existing: Option<&LockTerms>,
    requested: Option<&LockTerms>,
) -> Result<(), AssetExchangeError> {
    match (existing, requested) {
        (Some(a), Some(b)) if a != b => Err(AssetExchangeError::InvalidLockTerms(
            "session already bound to different lock terms".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Invariant: context-bearing requests come from the bound counterparty and
/// name its ledger.
pub fn invariant_counterparty_match(
    bound: &Counterparty,
    sender: &DriverId,
    ledger: &LedgerRef,
) -> Result<(), AssetExchangeError> {
    if bound.driver != *sender {
        return Err(AssetExchangeError::Mismatch {
            expected: format!("driver {}", bound.driver),
            actual: format!("driver {}", sender),
        });
    }
    if bound.ledger != *ledger {
        return Err(AssetExchangeError::Mismatch {
            expected: format!("ledger {}", bound.ledger),
            actual: format!("ledger {}", ledger),
        });
    }
    Ok(())
}

/// Invariant: assignment needs a recorded valid claim.
pub fn invariant_claim_recorded(session: &Session) -> Result<(), AssetExchangeError> {
    if session.preimage.is_none() {
        return Err(AssetExchangeError::InvalidPreimage);
    }
    Ok(())
}
