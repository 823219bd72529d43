//! # Transition Planning
//!
//! Decides what a requested move means for the current state: apply it,
//! treat it as a replay, or reject it.

use crate::domain::{AssetExchangeError, AssetRecord, Session};
use shared_types::{AssetStatus, SessionState};

/// Decision for a requested transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Take the edge.
    Apply,
    /// Already at or past `target`.
    Duplicate,
}

/// Plan a move from `current` to `target`.
///
/// Success-path targets the session already reached or passed are replays.
/// A repeated terminal target is a replay too. Anything else that is not an
/// edge is rejected.
pub fn plan(current: SessionState, target: SessionState) -> Result<Step, AssetExchangeError> {
    if current == target {
        return Ok(Step::Duplicate);
    }
    if let (Some(at), Some(wanted)) = (current.progress(), target.progress()) {
        if at >= wanted {
            return Ok(Step::Duplicate);
        }
    }
    if current.can_transition_to(target) {
        return Ok(Step::Apply);
    }
    Err(AssetExchangeError::InvalidTransition {
        from: current,
        to: target,
    })
}

/// Asset status implied by entering `state`, if it changes.
pub fn asset_status_on_entry(state: SessionState) -> Option<AssetStatus> {
    match state {
        SessionState::Locked => Some(AssetStatus::Locked),
        SessionState::AssetCreated => Some(AssetStatus::Created),
        SessionState::Assigned => Some(AssetStatus::Assigned),
        SessionState::Extinguished => Some(AssetStatus::Extinguished),
        SessionState::Expired => Some(AssetStatus::Reverted),
        _ => None,
    }
}

/// Update the session's asset record for entering `to`.
///
/// The record appears when the lock is confirmed. On expiry the owner is
/// restored, and a record is synthesized if a lock was submitted but never
/// confirmed.
pub fn apply_asset_effects(session: &mut Session, to: SessionState) {
    if session.asset.is_none() {
        let submitted = session.lock_tx_ref.is_some();
        let needs_record = to == SessionState::Locked || (to == SessionState::Expired && submitted);
        if needs_record {
            session.asset = session
                .lock_terms
                .as_ref()
                .map(|terms| AssetRecord::locked(&terms.asset));
        }
    }

    let Some(asset) = session.asset.as_mut() else {
        return;
    };
    match to {
        SessionState::Assigned => asset.assign(),
        SessionState::Expired => asset.revert(),
        other => {
            if let Some(status) = asset_status_on_entry(other) {
                asset.status = status;
            }
        }
    }
}
