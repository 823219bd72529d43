//! # Asset Exchange Service
//!
//! Implements `AssetExchangeApi` over a session table.
//!
//! ## Locking
//!
//! - The session table sits behind a short `parking_lot::RwLock`.
//! - Each session has a `tokio::sync::Mutex` held for the whole of a
//!   mutating operation, connector call included. Claim and expiry both take
//!   it, so whichever is recorded first wins.
//! - Readers clone a snapshot under the session's `RwLock` and see either
//!   the pre- or post-state of a transition.
//!
//! ## Recording Order
//!
//! A transition is journaled, then stored, then published on the bus.
//! Nothing is stored or published if the journal rejects it.

use crate::adapters::{InMemoryJournal, SystemClock};
use crate::algorithms::{apply_asset_effects, is_elapsed, plan, verify_claim, Step};
use crate::domain::{
    invariant_claim_recorded, invariant_counterparty_match, invariant_lock_terms,
    invariant_terms_unchanged, AssetExchangeConfig, AssetExchangeError, LedgerAction,
    LedgerReceipt, Preimage, ReceiptStatus, Session, TransitionOutcome, TransitionRecord,
};
use crate::metrics;
use crate::ports::{AssetExchangeApi, Clock, ConnectorError, LedgerConnector, TransitionJournal};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_bus::{EventPublisher, InMemoryEventBus, InteropEvent};
use shared_types::{
    ContractTransaction, Counterparty, DriverId, LedgerRef, LockTerms, SessionId, SessionState,
    SessionStatus, StatePayload, View,
};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Audit log target for terminal transitions.
pub const AUDIT_TARGET: &str = "ix::audit";

/// One session: an operation lock plus the readable record.
struct SessionSlot {
    op: tokio::sync::Mutex<()>,
    record: RwLock<Session>,
}

impl SessionSlot {
    fn new(session: Session) -> Self {
        Self {
            op: tokio::sync::Mutex::new(()),
            record: RwLock::new(session),
        }
    }

    fn snapshot(&self) -> Session {
        self.record.read().clone()
    }
}

/// Builder for `AssetExchangeService`.
pub struct AssetExchangeBuilder {
    config: AssetExchangeConfig,
    connector: Arc<dyn LedgerConnector>,
    clock: Arc<dyn Clock>,
    journal: Arc<dyn TransitionJournal>,
    bus: Arc<dyn EventPublisher>,
}

impl AssetExchangeBuilder {
    /// Set configuration.
    pub fn config(mut self, config: AssetExchangeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the transition journal.
    pub fn journal(mut self, journal: Arc<dyn TransitionJournal>) -> Self {
        self.journal = journal;
        self
    }

    /// Set the event bus.
    pub fn bus(mut self, bus: Arc<dyn EventPublisher>) -> Self {
        self.bus = bus;
        self
    }

    /// Build the service.
    pub fn build(self) -> Arc<AssetExchangeService> {
        Arc::new_cyclic(|me| AssetExchangeService {
            config: self.config,
            sessions: RwLock::new(HashMap::new()),
            timers: Mutex::new(HashMap::new()),
            connector: self.connector,
            clock: self.clock,
            journal: self.journal,
            bus: self.bus,
            me: me.clone(),
        })
    }
}

/// The Asset State Machine.
pub struct AssetExchangeService {
    config: AssetExchangeConfig,
    sessions: RwLock<HashMap<SessionId, Arc<SessionSlot>>>,
    timers: Mutex<HashMap<SessionId, JoinHandle<()>>>,
    connector: Arc<dyn LedgerConnector>,
    clock: Arc<dyn Clock>,
    journal: Arc<dyn TransitionJournal>,
    bus: Arc<dyn EventPublisher>,
    me: Weak<AssetExchangeService>,
}

impl AssetExchangeService {
    /// Start building a service around `connector`.
    pub fn builder(connector: Arc<dyn LedgerConnector>) -> AssetExchangeBuilder {
        AssetExchangeBuilder {
            config: AssetExchangeConfig::default(),
            connector,
            clock: Arc::new(SystemClock),
            journal: Arc::new(InMemoryJournal::new()),
            bus: Arc::new(InMemoryEventBus::new()),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &AssetExchangeConfig {
        &self.config
    }

    /// The ledger connector, for state queries.
    pub fn connector(&self) -> &Arc<dyn LedgerConnector> {
        &self.connector
    }

    /// The clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Number of sessions, terminal ones included.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    fn slot(&self, session_id: &SessionId) -> Result<Arc<SessionSlot>, AssetExchangeError> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| AssetExchangeError::SessionNotFound(session_id.clone()))
    }

    fn is_due(&self, session: &Session, now: u64) -> bool {
        session.is_past_deadline(now, self.config.assign_grace_secs)
    }

    fn refresh_active_gauge(&self) {
        let active = self
            .sessions
            .read()
            .values()
            .filter(|slot| !slot.record.read().state.is_terminal())
            .count();
        metrics::set_active_sessions(active);
    }

    async fn submit(
        &self,
        ledger: &LedgerRef,
        action: LedgerAction,
    ) -> Result<LedgerReceipt, ConnectorError> {
        let timeout = Duration::from_millis(self.config.connector_timeout_ms);
        match tokio::time::timeout(timeout, self.connector.submit_transaction(ledger, action)).await
        {
            Ok(result) => result,
            Err(_) => Err(ConnectorError::retryable(
                "TIMEOUT",
                format!("connector did not answer within {}ms", timeout.as_millis()),
            )),
        }
    }

    /// Journal, store and publish a transition.
    async fn commit(
        &self,
        slot: &SessionSlot,
        session: &mut Session,
        to: SessionState,
        reason: Option<String>,
    ) -> Result<TransitionOutcome, AssetExchangeError> {
        let now = self.clock.now();
        let from = session.transition_to(to, now)?;
        apply_asset_effects(session, to);
        if to.is_terminal() {
            session.failure_reason = reason.clone();
        }

        self.journal
            .append(TransitionRecord {
                session_id: session.id.clone(),
                from,
                to,
                at: now,
                reason: reason.clone(),
            })
            .map_err(AssetExchangeError::Journal)?;
        *slot.record.write() = session.clone();

        debug!("[ix-02] Session {} {} -> {}", session.id, from, to);
        metrics::record_transition(to.as_str());
        self.bus
            .publish(InteropEvent::SessionTransitioned {
                session_id: session.id.clone(),
                from,
                to,
            })
            .await;

        if to.is_terminal() {
            let reason = reason.unwrap_or_default();
            info!(
                target: AUDIT_TARGET,
                session_id = %session.id,
                state = %to,
                reason = %reason,
                "[ix-02] Session reached terminal state"
            );
            metrics::record_terminal(to.as_str());
            self.cancel_timer(&session.id);
            self.bus
                .publish(InteropEvent::SessionTerminal {
                    session_id: session.id.clone(),
                    state: to,
                    reason,
                })
                .await;
            self.refresh_active_gauge();
        }

        Ok(TransitionOutcome::Applied { from, to })
    }

    /// Map a connector failure: retryable leaves the session alone,
    /// anything else fails it.
    async fn connector_failed(
        &self,
        slot: &SessionSlot,
        session: &mut Session,
        action: &str,
        err: ConnectorError,
    ) -> AssetExchangeError {
        metrics::record_connector_error(err.retryable);
        if err.retryable {
            warn!(
                "[ix-02] Retryable {} failure for session {}: {}",
                action, session.id, err
            );
        } else {
            let reason = format!("{action} failed: {err}");
            if let Err(e) = self
                .commit(slot, session, SessionState::Failed, Some(reason))
                .await
            {
                warn!("[ix-02] Could not fail session {}: {}", session.id, e);
            }
        }
        AssetExchangeError::Remote {
            code: err.code,
            message: err.message,
            retryable: err.retryable,
        }
    }

    /// Release the lock (best effort) and move to `EXPIRED`.
    async fn expire_locked(
        &self,
        slot: &SessionSlot,
        session: &mut Session,
    ) -> Result<TransitionOutcome, AssetExchangeError> {
        let deadline = session
            .deadline(self.config.assign_grace_secs)
            .unwrap_or_default();
        if let (Some(_), Some(terms)) = (&session.lock_tx_ref, &session.lock_terms) {
            let release = LedgerAction::Release {
                asset_id: terms.asset.asset_id.clone(),
                owner: terms.asset.owner.clone(),
            };
            if let Err(e) = self.submit(&terms.asset.origin_ledger, release).await {
                warn!(
                    "[ix-02] Release for expired session {} failed: {}",
                    session.id, e
                );
            }
        }
        self.commit(
            slot,
            session,
            SessionState::Expired,
            Some(format!("deadline {deadline} elapsed ({})", session.state)),
        )
        .await
    }

    /// Expire the session if its deadline passed, then report `Expired`.
    async fn enforce_deadline(
        &self,
        slot: &SessionSlot,
        session: &mut Session,
    ) -> Result<(), AssetExchangeError> {
        if !self.is_due(session, self.clock.now()) {
            return Ok(());
        }
        let time_lock = session.time_lock().unwrap_or_default();
        self.expire_locked(slot, session).await?;
        Err(AssetExchangeError::Expired {
            session_id: session.id.clone(),
            time_lock,
        })
    }

    fn arm_timer(&self, session_id: &SessionId, deadline: u64) {
        if !self.config.expiry_timers {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };

        let me = self.me.clone();
        let clock = Arc::clone(&self.clock);
        let id = session_id.clone();
        let task = runtime.spawn(async move {
            loop {
                let now = clock.now();
                if is_elapsed(now, deadline) {
                    break;
                }
                tokio::time::sleep(Duration::from_secs(deadline - now + 1)).await;
            }
            let Some(service) = me.upgrade() else {
                return;
            };
            service.timers.lock().remove(&id);
            if let Err(e) = service.expire_if_due(&id).await {
                warn!("[ix-02] Expiry timer for session {} failed: {}", id, e);
            }
        });

        if let Some(previous) = self.timers.lock().insert(session_id.clone(), task) {
            previous.abort();
        }
    }

    fn cancel_timer(&self, session_id: &SessionId) {
        if let Some(task) = self.timers.lock().remove(session_id) {
            task.abort();
        }
    }

    // The `*_held` steps run with the caller holding `slot.op`.

    async fn confirm_lock_held(
        &self,
        slot: &SessionSlot,
        tx_ref: &str,
    ) -> Result<TransitionOutcome, AssetExchangeError> {
        let mut session = slot.snapshot();
        self.enforce_deadline(slot, &mut session).await?;

        if plan(session.state, SessionState::Locked)? == Step::Duplicate {
            return Ok(TransitionOutcome::Duplicate {
                state: session.state,
            });
        }
        if session.lock_tx_ref.is_none() {
            session.lock_tx_ref = Some(tx_ref.to_string());
        }
        self.commit(slot, &mut session, SessionState::Locked, None)
            .await
    }

    async fn claim_held(
        &self,
        slot: &SessionSlot,
        preimage: Preimage,
    ) -> Result<TransitionOutcome, AssetExchangeError> {
        let mut session = slot.snapshot();
        let session_id = session.id.clone();
        self.enforce_deadline(slot, &mut session)
            .await
            .inspect_err(|_| metrics::record_claim_rejected("expired"))?;

        if plan(session.state, SessionState::ClaimPending)? == Step::Duplicate {
            return Ok(TransitionOutcome::Duplicate {
                state: session.state,
            });
        }
        let terms = session
            .lock_terms
            .clone()
            .ok_or_else(|| AssetExchangeError::MissingLockTerms(session_id.clone()))?;

        if let Err(e) = verify_claim(&preimage, &terms, &session_id, self.clock.now()) {
            if matches!(e, AssetExchangeError::Expired { .. }) {
                self.expire_locked(slot, &mut session).await?;
                metrics::record_claim_rejected("expired");
            } else {
                metrics::record_claim_rejected("invalid_preimage");
                warn!("[ix-02] Rejected claim for session {}: {}", session_id, e);
            }
            return Err(e);
        }

        session.preimage = Some(preimage);
        let outcome = self
            .commit(slot, &mut session, SessionState::ClaimPending, None)
            .await?;
        if self.config.assign_grace_secs > 0 {
            self.arm_timer(
                &session_id,
                terms.time_lock.saturating_add(self.config.assign_grace_secs),
            );
        }
        Ok(outcome)
    }
}

#[async_trait]
impl AssetExchangeApi for AssetExchangeService {
    async fn open_session(
        &self,
        session_id: SessionId,
        counterparty: Counterparty,
        lock_terms: Option<LockTerms>,
    ) -> Result<TransitionOutcome, AssetExchangeError> {
        let now = self.clock.now();
        if let Some(terms) = &lock_terms {
            invariant_lock_terms(terms, now, self.config.min_time_lock_secs)?;
        }

        let existing = {
            let mut sessions = self.sessions.write();
            match sessions.get(&session_id) {
                Some(slot) => Some(Arc::clone(slot)),
                None => {
                    let mut session = Session::new(session_id.clone(), now);
                    session.counterparty = Some(counterparty.clone());
                    session.lock_terms = lock_terms.clone();
                    sessions.insert(session_id.clone(), Arc::new(SessionSlot::new(session)));
                    None
                }
            }
        };

        let Some(slot) = existing else {
            info!(
                "[ix-02] Opened session {} with {} on {}",
                session_id, counterparty.driver, counterparty.ledger
            );
            if let Some(terms) = &lock_terms {
                self.arm_timer(&session_id, terms.time_lock);
            }
            self.refresh_active_gauge();
            return Ok(TransitionOutcome::Recorded {
                state: SessionState::Initiated,
            });
        };

        let _guard = slot.op.lock().await;
        let mut session = slot.snapshot();
        match &session.counterparty {
            Some(bound) => {
                invariant_counterparty_match(bound, &counterparty.driver, &counterparty.ledger)?
            }
            None => session.counterparty = Some(counterparty),
        }
        invariant_terms_unchanged(session.lock_terms.as_ref(), lock_terms.as_ref())?;
        if session.lock_terms.is_none() {
            if let Some(terms) = &lock_terms {
                self.arm_timer(&session_id, terms.time_lock);
            }
            session.lock_terms = lock_terms;
        }
        let state = session.state;
        *slot.record.write() = session;
        Ok(TransitionOutcome::Duplicate { state })
    }

    async fn ensure_session(&self, session_id: &SessionId) -> Result<bool, AssetExchangeError> {
        if self.sessions.read().contains_key(session_id) {
            return Ok(false);
        }
        if !self.config.lazy_session_creation {
            return Err(AssetExchangeError::SessionNotFound(session_id.clone()));
        }

        let created = {
            let mut sessions = self.sessions.write();
            if sessions.contains_key(session_id) {
                false
            } else {
                let session = Session::new(session_id.clone(), self.clock.now());
                sessions.insert(session_id.clone(), Arc::new(SessionSlot::new(session)));
                true
            }
        };
        if created {
            debug!("[ix-02] Lazily created session {}", session_id);
            self.refresh_active_gauge();
        }
        Ok(created)
    }

    async fn check_context(
        &self,
        session_id: &SessionId,
        sender: &DriverId,
        ctx: &ContractTransaction,
    ) -> Result<(), AssetExchangeError> {
        let slot = self.slot(session_id)?;
        let _guard = slot.op.lock().await;
        let bound = slot.record.read().counterparty.clone();
        match bound {
            Some(bound) => invariant_counterparty_match(&bound, sender, &ctx.ledger)
                .inspect_err(|e| warn!("[ix-02] Session {}: {}", session_id, e)),
            None => {
                debug!(
                    "[ix-02] Binding session {} to {} on {}",
                    session_id, sender, ctx.ledger
                );
                slot.record.write().counterparty = Some(Counterparty {
                    driver: sender.clone(),
                    ledger: ctx.ledger.clone(),
                });
                Ok(())
            }
        }
    }

    async fn perform_lock(
        &self,
        session_id: &SessionId,
        lock_terms: Option<LockTerms>,
    ) -> Result<TransitionOutcome, AssetExchangeError> {
        let slot = self.slot(session_id)?;
        let _guard = slot.op.lock().await;
        let mut session = slot.snapshot();
        self.enforce_deadline(&slot, &mut session).await?;

        if plan(session.state, SessionState::LockRequested)? == Step::Duplicate {
            return Ok(TransitionOutcome::Duplicate {
                state: session.state,
            });
        }

        invariant_terms_unchanged(session.lock_terms.as_ref(), lock_terms.as_ref())?;
        let terms = session
            .lock_terms
            .clone()
            .or(lock_terms)
            .ok_or_else(|| AssetExchangeError::MissingLockTerms(session_id.clone()))?;
        invariant_lock_terms(&terms, self.clock.now(), self.config.min_time_lock_secs)?;
        session.lock_terms = Some(terms.clone());

        let action = LedgerAction::Lock {
            asset: terms.asset.clone(),
            hash_lock: terms.hash_lock,
            digest: terms.digest,
            time_lock: terms.time_lock,
        };
        let receipt = match self.submit(&terms.asset.origin_ledger, action).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.connector_failed(&slot, &mut session, "lock", e).await),
        };

        session.lock_tx_ref = Some(receipt.tx_ref);
        let requested = self
            .commit(&slot, &mut session, SessionState::LockRequested, None)
            .await?;
        self.arm_timer(session_id, terms.time_lock);

        if receipt.status == ReceiptStatus::Confirmed {
            self.commit(&slot, &mut session, SessionState::Locked, None)
                .await?;
            return Ok(TransitionOutcome::Applied {
                from: SessionState::Initiated,
                to: SessionState::Locked,
            });
        }
        Ok(requested)
    }

    async fn confirm_lock(
        &self,
        session_id: &SessionId,
        tx_ref: &str,
    ) -> Result<TransitionOutcome, AssetExchangeError> {
        let slot = self.slot(session_id)?;
        let _guard = slot.op.lock().await;
        self.confirm_lock_held(&slot, tx_ref).await
    }

    async fn create_asset(
        &self,
        session_id: &SessionId,
    ) -> Result<TransitionOutcome, AssetExchangeError> {
        let slot = self.slot(session_id)?;
        let _guard = slot.op.lock().await;
        let mut session = slot.snapshot();
        self.enforce_deadline(&slot, &mut session).await?;

        if plan(session.state, SessionState::AssetCreated)? == Step::Duplicate {
            return Ok(TransitionOutcome::Duplicate {
                state: session.state,
            });
        }
        let terms = session
            .lock_terms
            .clone()
            .ok_or_else(|| AssetExchangeError::MissingLockTerms(session_id.clone()))?;

        let action = LedgerAction::Create {
            asset: terms.asset.clone(),
        };
        if let Err(e) = self.submit(&terms.asset.origin_ledger, action).await {
            return Err(self.connector_failed(&slot, &mut session, "create", e).await);
        }
        self.commit(&slot, &mut session, SessionState::AssetCreated, None)
            .await
    }

    async fn claim(
        &self,
        session_id: &SessionId,
        preimage: Preimage,
    ) -> Result<TransitionOutcome, AssetExchangeError> {
        let slot = self.slot(session_id)?;
        let _guard = slot.op.lock().await;
        self.claim_held(&slot, preimage).await
    }

    async fn assign_asset(
        &self,
        session_id: &SessionId,
    ) -> Result<TransitionOutcome, AssetExchangeError> {
        let slot = self.slot(session_id)?;
        let _guard = slot.op.lock().await;
        let mut session = slot.snapshot();
        self.enforce_deadline(&slot, &mut session).await?;

        let step = plan(session.state, SessionState::Assigned);
        if step == Ok(Step::Duplicate) {
            return Ok(TransitionOutcome::Duplicate {
                state: session.state,
            });
        }
        if !session.state.is_terminal() {
            invariant_claim_recorded(&session)?;
        }
        step?;

        let (Some(terms), Some(preimage)) = (session.lock_terms.clone(), session.preimage.clone())
        else {
            return Err(AssetExchangeError::MissingLockTerms(session_id.clone()));
        };
        let action = LedgerAction::Assign {
            asset_id: terms.asset.asset_id.clone(),
            recipient: terms.asset.recipient.clone(),
            preimage: preimage.as_bytes().to_vec(),
        };
        if let Err(e) = self.submit(&terms.asset.origin_ledger, action).await {
            return Err(self.connector_failed(&slot, &mut session, "assign", e).await);
        }
        let reason = format!("asset {} assigned to {}", terms.asset.asset_id, terms.asset.recipient);
        self.commit(&slot, &mut session, SessionState::Assigned, Some(reason))
            .await
    }

    async fn extinguish(
        &self,
        session_id: &SessionId,
    ) -> Result<TransitionOutcome, AssetExchangeError> {
        let slot = self.slot(session_id)?;
        let _guard = slot.op.lock().await;
        let mut session = slot.snapshot();
        self.enforce_deadline(&slot, &mut session).await?;

        if plan(session.state, SessionState::Extinguished)? == Step::Duplicate {
            return Ok(TransitionOutcome::Duplicate {
                state: session.state,
            });
        }
        let terms = session
            .lock_terms
            .clone()
            .ok_or_else(|| AssetExchangeError::MissingLockTerms(session_id.clone()))?;

        let action = LedgerAction::Extinguish {
            asset_id: terms.asset.asset_id.clone(),
        };
        if let Err(e) = self.submit(&terms.asset.origin_ledger, action).await {
            return Err(self.connector_failed(&slot, &mut session, "extinguish", e).await);
        }
        let reason = format!("asset {} extinguished", terms.asset.asset_id);
        self.commit(&slot, &mut session, SessionState::Extinguished, Some(reason))
            .await
    }

    async fn expire_if_due(&self, session_id: &SessionId) -> Result<bool, AssetExchangeError> {
        let slot = self.slot(session_id)?;
        let _guard = slot.op.lock().await;
        let mut session = slot.snapshot();
        if !self.is_due(&session, self.clock.now()) {
            return Ok(false);
        }
        self.expire_locked(&slot, &mut session).await?;
        Ok(true)
    }

    async fn record_view(
        &self,
        session_id: &SessionId,
        key: String,
        view: View,
    ) -> Result<bool, AssetExchangeError> {
        let slot = self.slot(session_id)?;
        let _guard = slot.op.lock().await;
        let stored = slot.record.write().record_view(key.clone(), view);
        if !stored {
            debug!(
                "[ix-02] Kept newer view {} for session {}",
                key, session_id
            );
        }
        Ok(stored)
    }

    async fn apply_event(
        &self,
        session_id: &SessionId,
        view: &View,
    ) -> Result<TransitionOutcome, AssetExchangeError> {
        let slot = self.slot(session_id)?;
        let key = view.contract_context.dedup_key();
        let _guard = slot.op.lock().await;
        let (current, seen) = {
            let record = slot.record.read();
            (record.state, record.applied_events.contains(&key))
        };
        if seen {
            return Ok(TransitionOutcome::Duplicate { state: current });
        }

        let outcome = match &view.payload.data {
            StatePayload::LockReceipt { tx_ref } => self.confirm_lock_held(&slot, tx_ref).await?,
            StatePayload::Preimage(bytes) => {
                self.claim_held(&slot, Preimage::from_slice(bytes)).await?
            }
            _ => TransitionOutcome::Recorded { state: current },
        };

        slot.record.write().applied_events.insert(key);
        debug!(
            "[ix-02] Applied {} from tx {} to session {}: {:?}",
            view.contract_context.event_name, view.contract_context.tx_id, session_id, outcome
        );
        Ok(outcome)
    }

    async fn status(&self, session_id: &SessionId) -> Result<SessionStatus, AssetExchangeError> {
        let slot = self.slot(session_id)?;
        if self.is_due(&slot.snapshot(), self.clock.now()) {
            self.expire_if_due(session_id).await?;
        }
        let status = slot.record.read().status();
        Ok(status)
    }

    fn counterparty(&self, session_id: &SessionId) -> Option<Counterparty> {
        let slot = self.sessions.read().get(session_id).cloned()?;
        let record = slot.record.read();
        record.counterparty.clone()
    }

    fn view(&self, session_id: &SessionId, key: &str) -> Option<View> {
        let slot = self.sessions.read().get(session_id).cloned()?;
        let record = slot.record.read();
        record.views.get(key).cloned()
    }

    fn history(&self, session_id: &SessionId) -> Vec<TransitionRecord> {
        self.journal.history(session_id)
    }

    async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let due: Vec<SessionId> = self
            .sessions
            .read()
            .iter()
            .filter(|(_, slot)| self.is_due(&slot.record.read(), now))
            .map(|(id, _)| id.clone())
            .collect();

        let mut expired = 0;
        for id in due {
            match self.expire_if_due(&id).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => warn!("[ix-02] Sweep could not expire session {}: {}", id, e),
            }
        }
        if expired > 0 {
            info!("[ix-02] Sweep expired {} session(s)", expired);
        }
        expired
    }
}
