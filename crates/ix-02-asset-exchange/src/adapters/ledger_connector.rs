//! In-Memory Ledger Connector
//!
//! Implements `LedgerConnector` against a process-local ledger. Used by
//! tests and single-process runs; production deployments plug in a
//! connector per ledger technology.

use crate::domain::{LedgerAction, LedgerReceipt, ReceiptStatus};
use crate::ports::{ConnectorError, LedgerConnector};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::{LedgerRef, StatePayload};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Ledger-side status of a locked asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryStatus {
    /// Held under the hash lock.
    Locked,
    /// Represented on the target ledger.
    Created,
    /// Transferred to the recipient.
    Assigned,
    /// Burned.
    Extinguished,
    /// Returned to the original owner.
    Released,
}

/// One asset as the ledger sees it.
#[derive(Clone, Debug)]
pub struct LedgerEntry {
    /// Ledger holding the asset.
    pub ledger: LedgerRef,
    /// Current owner.
    pub owner: String,
    /// Status.
    pub status: EntryStatus,
    /// Reference of the lock transaction.
    pub lock_tx: String,
}

/// In-memory ledger connector.
pub struct InMemoryLedgerConnector {
    /// Asset id -> entry.
    entries: RwLock<HashMap<String, LedgerEntry>>,
    /// Explicit state served by `query_state`.
    state: RwLock<HashMap<(LedgerRef, String), StatePayload>>,
    /// Every accepted submission, in order.
    submitted: RwLock<Vec<(LedgerRef, LedgerAction)>>,
    /// Receipt status returned for locks.
    lock_status: RwLock<ReceiptStatus>,
    /// Failures to return before serving further calls.
    failures: Mutex<VecDeque<ConnectorError>>,
    /// Artificial latency per call.
    delay: RwLock<Option<Duration>>,
}

impl InMemoryLedgerConnector {
    /// Create a connector that confirms locks immediately.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            state: RwLock::new(HashMap::new()),
            submitted: RwLock::new(Vec::new()),
            lock_status: RwLock::new(ReceiptStatus::Confirmed),
            failures: Mutex::new(VecDeque::new()),
            delay: RwLock::new(None),
        }
    }

    /// Return `Pending` for locks; confirmation must arrive as an event.
    pub fn with_pending_locks(self) -> Self {
        *self.lock_status.write() = ReceiptStatus::Pending;
        self
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: ConnectorError) {
        self.failures.lock().push_back(error);
    }

    /// Delay every call by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    /// Serve `payload` for `address` on `ledger`.
    pub fn put_state(&self, ledger: LedgerRef, address: impl Into<String>, payload: StatePayload) {
        self.state.write().insert((ledger, address.into()), payload);
    }

    /// Accepted submissions, in order.
    pub fn submitted(&self) -> Vec<LedgerAction> {
        self.submitted.read().iter().map(|(_, a)| a.clone()).collect()
    }

    /// Ledger view of an asset.
    pub fn entry(&self, asset_id: &str) -> Option<LedgerEntry> {
        self.entries.read().get(asset_id).cloned()
    }

    async fn before_call(&self) -> Result<(), ConnectorError> {
        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failures.lock().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn apply(&self, ledger: &LedgerRef, action: &LedgerAction, tx_ref: &str) -> Result<(), ConnectorError> {
        let mut entries = self.entries.write();
        if let LedgerAction::Lock { asset, .. } = action {
            if entries
                .get(&asset.asset_id)
                .is_some_and(|e| e.status == EntryStatus::Locked)
            {
                return Err(ConnectorError::fatal(
                    "ALREADY_LOCKED",
                    format!("asset {} already locked", asset.asset_id),
                ));
            }
            entries.insert(
                asset.asset_id.clone(),
                LedgerEntry {
                    ledger: ledger.clone(),
                    owner: asset.owner.clone(),
                    status: EntryStatus::Locked,
                    lock_tx: tx_ref.to_string(),
                },
            );
            return Ok(());
        }

        let asset_id = action.asset_id();
        let entry = entries.get_mut(asset_id).ok_or_else(|| {
            ConnectorError::fatal("UNKNOWN_ASSET", format!("asset {asset_id} not locked"))
        })?;
        match action {
            LedgerAction::Create { .. } => entry.status = EntryStatus::Created,
            LedgerAction::Extinguish { .. } => entry.status = EntryStatus::Extinguished,
            LedgerAction::Assign { recipient, .. } => {
                entry.owner = recipient.clone();
                entry.status = EntryStatus::Assigned;
            }
            LedgerAction::Release { owner, .. } => {
                entry.owner = owner.clone();
                entry.status = EntryStatus::Released;
            }
            LedgerAction::Lock { .. } => {}
        }
        Ok(())
    }
}

impl Default for InMemoryLedgerConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerConnector for InMemoryLedgerConnector {
    async fn submit_transaction(
        &self,
        ledger: &LedgerRef,
        action: LedgerAction,
    ) -> Result<LedgerReceipt, ConnectorError> {
        self.before_call().await?;

        let tx_ref = format!("tx-{}", Uuid::new_v4().simple());
        self.apply(ledger, &action, &tx_ref)?;

        info!(
            "[ix-02] Ledger {} applied {} for asset {} ({})",
            ledger,
            action.name(),
            action.asset_id(),
            tx_ref
        );

        let status = match action {
            LedgerAction::Lock { .. } => *self.lock_status.read(),
            _ => ReceiptStatus::Confirmed,
        };
        self.submitted.write().push((ledger.clone(), action));
        Ok(LedgerReceipt { tx_ref, status })
    }

    async fn query_state(
        &self,
        ledger: &LedgerRef,
        address: &str,
    ) -> Result<StatePayload, ConnectorError> {
        self.before_call().await?;
        debug!("[ix-02] Ledger {} query {}", ledger, address);

        if let Some(payload) = self.state.read().get(&(ledger.clone(), address.to_string())) {
            return Ok(payload.clone());
        }

        // Built-in addresses over locked assets
        let entries = self.entries.read();
        let lookup = |id: &str| {
            entries
                .get(id)
                .filter(|e| e.ledger == *ledger)
                .ok_or_else(|| ConnectorError::fatal("NOT_FOUND", format!("no asset {id}")))
        };
        if let Some(id) = address.strip_prefix("lock:") {
            let entry = lookup(id)?;
            return Ok(StatePayload::LockReceipt {
                tx_ref: entry.lock_tx.clone(),
            });
        }
        if let Some(id) = address.strip_prefix("owner:") {
            let entry = lookup(id)?;
            return Ok(StatePayload::json(&serde_json::json!({
                "asset_id": id,
                "owner": entry.owner,
            })));
        }

        Err(ConnectorError::fatal(
            "NOT_FOUND",
            format!("nothing at {address} on {ledger}"),
        ))
    }
}
