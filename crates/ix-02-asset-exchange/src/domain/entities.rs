//! # Domain Entities
//!
//! Session, the asset record it drives, and the journal record written for
//! every transition.

use super::errors::AssetExchangeError;
use super::preimage::Preimage;
use shared_types::{
    AssetAmount, AssetDescriptor, AssetStatus, Counterparty, Hash, LedgerRef, LockTerms,
    SessionId, SessionState, SessionStatus, View,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The asset a session moves. Created when the lock is confirmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Asset identifier on the origin ledger.
    pub asset_id: String,
    /// Current owner.
    pub owner: String,
    /// Owner at lock time; restored on expiry.
    pub original_owner: String,
    /// Owner after assignment.
    pub recipient: String,
    /// Amount or token reference.
    pub amount: AssetAmount,
    /// Ledger holding the asset.
    pub origin_ledger: LedgerRef,
    /// Lifecycle status.
    pub status: AssetStatus,
}

impl AssetRecord {
    /// Record a freshly locked asset.
    pub fn locked(asset: &AssetDescriptor) -> Self {
        Self {
            asset_id: asset.asset_id.clone(),
            owner: asset.owner.clone(),
            original_owner: asset.owner.clone(),
            recipient: asset.recipient.clone(),
            amount: asset.amount.clone(),
            origin_ledger: asset.origin_ledger.clone(),
            status: AssetStatus::Locked,
        }
    }

    /// Hand the asset to its recipient.
    pub fn assign(&mut self) {
        self.owner = self.recipient.clone();
        self.status = AssetStatus::Assigned;
    }

    /// Return the asset to its original owner.
    pub fn revert(&mut self) {
        self.owner = self.original_owner.clone();
        self.status = AssetStatus::Reverted;
    }
}

/// One cross-ledger exchange.
#[derive(Clone, Debug)]
pub struct Session {
    /// Caller-generated id.
    pub id: SessionId,
    /// Current state.
    pub state: SessionState,
    /// Remote driver and ledger, bound at open or on first contact.
    pub counterparty: Option<Counterparty>,
    /// Hash lock, time lock and asset.
    pub lock_terms: Option<LockTerms>,
    /// Asset record, once the lock is confirmed.
    pub asset: Option<AssetRecord>,
    /// Transaction reference returned by the lock submission.
    pub lock_tx_ref: Option<String>,
    /// Preimage of an accepted claim.
    pub preimage: Option<Preimage>,
    /// Latest View per query key.
    pub views: HashMap<String, View>,
    /// Contract contexts whose events were already applied.
    pub applied_events: HashSet<Hash>,
    /// Reason recorded on terminal entry.
    pub failure_reason: Option<String>,
    /// Creation time, unix seconds.
    pub created_at: u64,
    /// Last transition time, unix seconds.
    pub updated_at: u64,
}

impl Session {
    /// Create an `INITIATED` session.
    pub fn new(id: SessionId, now: u64) -> Self {
        Self {
            id,
            state: SessionState::Initiated,
            counterparty: None,
            lock_terms: None,
            asset: None,
            lock_tx_ref: None,
            preimage: None,
            views: HashMap::new(),
            applied_events: HashSet::new(),
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The lock deadline, if terms are known.
    pub fn time_lock(&self) -> Option<u64> {
        self.lock_terms.as_ref().map(|t| t.time_lock)
    }

    /// Effective deadline. A recorded claim gets `assign_grace_secs` past
    /// the time lock to be assigned.
    pub fn deadline(&self, assign_grace_secs: u64) -> Option<u64> {
        let time_lock = self.time_lock()?;
        if self.state == SessionState::ClaimPending {
            Some(time_lock.saturating_add(assign_grace_secs))
        } else {
            Some(time_lock)
        }
    }

    /// Whether the deadline has elapsed while the state is still expirable.
    pub fn is_past_deadline(&self, now: u64, assign_grace_secs: u64) -> bool {
        self.state.is_expirable()
            && self
                .deadline(assign_grace_secs)
                .is_some_and(|deadline| crate::algorithms::is_elapsed(now, deadline))
    }

    /// Move along an edge of the state machine.
    pub fn transition_to(
        &mut self,
        next: SessionState,
        now: u64,
    ) -> Result<SessionState, AssetExchangeError> {
        if !self.state.can_transition_to(next) {
            return Err(AssetExchangeError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        let from = self.state;
        self.state = next;
        self.updated_at = now;
        Ok(from)
    }

    /// Store `view` under `key` unless a newer View is already there.
    /// Returns whether the View was stored.
    pub fn record_view(&mut self, key: String, view: View) -> bool {
        match self.views.get(&key) {
            Some(existing) if existing.meta.timestamp > view.meta.timestamp => false,
            _ => {
                self.views.insert(key, view);
                true
            }
        }
    }

    /// Read-only status snapshot.
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.id.clone(),
            state: self.state,
            asset_status: self.asset.as_ref().map(|a| a.status),
            asset_owner: self.asset.as_ref().map(|a| a.owner.clone()),
            failure_reason: self.failure_reason.clone(),
        }
    }
}

/// Journal entry for one transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Session.
    pub session_id: SessionId,
    /// Previous state.
    pub from: SessionState,
    /// New state.
    pub to: SessionState,
    /// Transition time, unix seconds.
    pub at: u64,
    /// Terminal reason, if any.
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{
        ContractTransaction, DigestAlgorithm, LedgerProtocol, StatePayload, ViewMeta, ViewPayload,
        U256,
    };

    fn descriptor() -> AssetDescriptor {
        AssetDescriptor {
            asset_id: "bond-7".to_string(),
            owner: "alice".to_string(),
            recipient: "bob".to_string(),
            amount: AssetAmount::Fungible(U256::from(100u64)),
            origin_ledger: LedgerRef::new("fabric-net", "trade"),
        }
    }

    fn view(timestamp: u64) -> View {
        View {
            meta: ViewMeta {
                network_id: "fabric-net".to_string(),
                protocol: LedgerProtocol::Fabric,
                timestamp,
            },
            contract_context: ContractTransaction {
                ledger: LedgerRef::new("fabric-net", "trade"),
                contract_address: "htlc".to_string(),
                event_name: "Locked".to_string(),
                block_ref: 1,
                tx_id: "tx-1".to_string(),
            },
            payload: ViewPayload {
                data: StatePayload::Opaque(vec![]),
                notarizations: vec![],
            },
        }
    }

    #[test]
    fn test_asset_assign_and_revert() {
        let mut record = AssetRecord::locked(&descriptor());
        assert_eq!(record.status, AssetStatus::Locked);
        record.assign();
        assert_eq!(record.owner, "bob");
        record.revert();
        assert_eq!(record.owner, "alice");
        assert_eq!(record.status, AssetStatus::Reverted);
    }

    #[test]
    fn test_transition_follows_edges() {
        let mut session = Session::new(SessionId::new("s1"), 10);
        assert_eq!(
            session.transition_to(SessionState::LockRequested, 11).unwrap(),
            SessionState::Initiated
        );
        assert_eq!(session.updated_at, 11);
        assert!(matches!(
            session.transition_to(SessionState::Assigned, 12),
            Err(AssetExchangeError::InvalidTransition { .. })
        ));
        assert_eq!(session.state, SessionState::LockRequested);
    }

    #[test]
    fn test_deadline_applies_to_claim_pending() {
        let mut session = Session::new(SessionId::new("s1"), 0);
        assert!(!session.is_past_deadline(u64::MAX, 0));

        session.lock_terms = Some(LockTerms {
            hash_lock: [0u8; 32],
            digest: DigestAlgorithm::Sha256,
            time_lock: 100,
            asset: descriptor(),
        });
        assert!(!session.is_past_deadline(100, 30));
        assert!(session.is_past_deadline(101, 30));

        session.state = SessionState::ClaimPending;
        assert!(session.is_past_deadline(101, 0));
        assert!(!session.is_past_deadline(130, 30));
        assert!(session.is_past_deadline(131, 30));

        session.state = SessionState::Assigned;
        assert!(!session.is_past_deadline(u64::MAX, 0));
    }

    #[test]
    fn test_newer_view_supersedes() {
        let mut session = Session::new(SessionId::new("s1"), 0);
        assert!(session.record_view("k".to_string(), view(5)));
        assert!(!session.record_view("k".to_string(), view(4)));
        assert!(session.record_view("k".to_string(), view(6)));
        assert_eq!(session.views["k"].meta.timestamp, 6);
    }

    #[test]
    fn test_status_snapshot() {
        let mut session = Session::new(SessionId::new("s1"), 0);
        assert_eq!(session.status().asset_status, None);
        session.asset = Some(AssetRecord::locked(&descriptor()));
        let status = session.status();
        assert_eq!(status.asset_owner.as_deref(), Some("alice"));
        assert_eq!(status.state, SessionState::Initiated);
    }
}
