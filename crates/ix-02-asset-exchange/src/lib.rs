//! # IX-02 Asset State Machine
//!
//! Per-session HTLC state machine coordinating one asset across two ledgers
//! that share no trust root and no commit point.
//!
//! **Component ID:** 2
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## State Machine
//!
//! ```text
//! INITIATED --performLock--> LOCK_REQUESTED --lock applied--> LOCKED
//! LOCKED --createAsset--> ASSET_CREATED --valid claim--> CLAIM_PENDING
//! CLAIM_PENDING --assignAsset--> ASSIGNED                  (success)
//! LOCKED | ASSET_CREATED --extinguish--> EXTINGUISHED      (aborted)
//! any non-terminal --deadline--> EXPIRED                   (reverted)
//! any non-terminal --unrecoverable remote error--> FAILED
//! ```
//!
//! ## Guarantees
//!
//! | Rule | Enforcement |
//! |------|-------------|
//! | Edges only | `SessionState::can_transition_to` before every move |
//! | Replays are no-ops | `plan` returns `Duplicate` at or past the target |
//! | Claim vs. expiry | Both take the session lock; first recorded wins |
//! | Late claim | `Expired`, session forced to `EXPIRED` |
//! | Recorded before visible | Journal, then store, then publish |
//!
//! ## Module Structure
//!
//! ```text
//! ix-02-asset-exchange/
//! ├── domain/          # Session, AssetRecord, Preimage, errors, invariants
//! ├── algorithms/      # hash lock checks, transition planning
//! ├── ports/           # AssetExchangeApi, LedgerConnector, Clock, TransitionJournal
//! ├── adapters/        # in-memory connector and journal, clocks
//! ├── metrics.rs       # optional Prometheus counters
//! └── service.rs       # AssetExchangeService
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{EntryStatus, InMemoryJournal, InMemoryLedgerConnector, ManualClock, SystemClock};
pub use algorithms::{create_hash_lock, generate_preimage, is_elapsed, verify_claim, verify_preimage};
pub use domain::{
    AssetExchangeConfig, AssetExchangeError, AssetRecord, LedgerAction, LedgerReceipt, Preimage,
    ReceiptStatus, Session, TransitionOutcome, TransitionRecord,
};
pub use ports::{AssetExchangeApi, Clock, ConnectorError, LedgerConnector, TransitionJournal};
pub use service::{AssetExchangeBuilder, AssetExchangeService, AUDIT_TARGET};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
