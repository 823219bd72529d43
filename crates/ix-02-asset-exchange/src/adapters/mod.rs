//! # Adapters Module
//!
//! In-memory connector and journal, and clocks.

pub mod clock;
pub mod journal;
pub mod ledger_connector;

pub use clock::{ManualClock, SystemClock};
pub use journal::InMemoryJournal;
pub use ledger_connector::{EntryStatus, InMemoryLedgerConnector, LedgerEntry};
