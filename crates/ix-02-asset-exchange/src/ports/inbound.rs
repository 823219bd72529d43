//! # Inbound Ports
//!
//! API trait defining what the Asset State Machine can do. Every mutating
//! call for one session is serialized; calls for different sessions run
//! concurrently.

use crate::domain::{AssetExchangeError, Preimage, TransitionOutcome, TransitionRecord};
use async_trait::async_trait;
use shared_types::{
    ContractTransaction, Counterparty, DriverId, LockTerms, SessionId, SessionStatus, View,
};

/// Asset exchange API - inbound port.
#[async_trait]
pub trait AssetExchangeApi: Send + Sync {
    /// Open a session bound to a counterparty. Re-opening with the same
    /// binding is a no-op.
    async fn open_session(
        &self,
        session_id: SessionId,
        counterparty: Counterparty,
        lock_terms: Option<LockTerms>,
    ) -> Result<TransitionOutcome, AssetExchangeError>;

    /// Make sure `session_id` exists, creating it when lazy creation is on.
    /// Returns whether it was created.
    async fn ensure_session(&self, session_id: &SessionId) -> Result<bool, AssetExchangeError>;

    /// Check that `sender` and `ctx` match the session's counterparty,
    /// binding it on first contact.
    async fn check_context(
        &self,
        session_id: &SessionId,
        sender: &DriverId,
        ctx: &ContractTransaction,
    ) -> Result<(), AssetExchangeError>;

    /// `INITIATED -> LOCK_REQUESTED`, and on to `LOCKED` if the ledger
    /// confirms at once.
    async fn perform_lock(
        &self,
        session_id: &SessionId,
        lock_terms: Option<LockTerms>,
    ) -> Result<TransitionOutcome, AssetExchangeError>;

    /// `LOCK_REQUESTED -> LOCKED` on a remote lock-applied event.
    async fn confirm_lock(
        &self,
        session_id: &SessionId,
        tx_ref: &str,
    ) -> Result<TransitionOutcome, AssetExchangeError>;

    /// `LOCKED -> ASSET_CREATED`.
    async fn create_asset(&self, session_id: &SessionId)
        -> Result<TransitionOutcome, AssetExchangeError>;

    /// `ASSET_CREATED -> CLAIM_PENDING` with a valid preimage.
    async fn claim(
        &self,
        session_id: &SessionId,
        preimage: Preimage,
    ) -> Result<TransitionOutcome, AssetExchangeError>;

    /// `CLAIM_PENDING -> ASSIGNED`.
    async fn assign_asset(&self, session_id: &SessionId)
        -> Result<TransitionOutcome, AssetExchangeError>;

    /// `LOCKED | ASSET_CREATED -> EXTINGUISHED`.
    async fn extinguish(&self, session_id: &SessionId)
        -> Result<TransitionOutcome, AssetExchangeError>;

    /// Expire the session if its deadline has elapsed. Returns whether it
    /// moved to `EXPIRED`.
    async fn expire_if_due(&self, session_id: &SessionId) -> Result<bool, AssetExchangeError>;

    /// Store a View on the session under `key`.
    async fn record_view(
        &self,
        session_id: &SessionId,
        key: String,
        view: View,
    ) -> Result<bool, AssetExchangeError>;

    /// Apply the event a verified View carries, once per contract context.
    async fn apply_event(
        &self,
        session_id: &SessionId,
        view: &View,
    ) -> Result<TransitionOutcome, AssetExchangeError>;

    /// Status snapshot; expires the session first if its deadline elapsed.
    async fn status(&self, session_id: &SessionId) -> Result<SessionStatus, AssetExchangeError>;

    /// Counterparty the session is bound to, if any.
    fn counterparty(&self, session_id: &SessionId) -> Option<Counterparty>;

    /// Latest View stored under `key`.
    fn view(&self, session_id: &SessionId, key: &str) -> Option<View>;

    /// Journaled transitions for a session.
    fn history(&self, session_id: &SessionId) -> Vec<TransitionRecord>;

    /// Expire every session whose deadline elapsed. Returns how many moved.
    async fn sweep_expired(&self) -> usize;
}
