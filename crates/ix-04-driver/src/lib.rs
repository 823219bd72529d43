//! # IX-04 Driver Client and Server
//!
//! The driver-to-driver RPC surface. The client seals requests into
//! `DriverEnvelope`s and waits for sealed responses; the server verifies
//! them and dispatches to the asset state machine and subscription manager.
//!
//! **Component ID:** 4
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Operations
//!
//! | Request | Server action | Response |
//! |---------|---------------|----------|
//! | `RequestDriverState` | Read ledger, notarize, call back `WriteExternalState` | `Ack` |
//! | `SubscribeEvent` | Register subscription | `Ack` (id) |
//! | `RequestSignedEventSubscriptionQuery` | Sign the subscription's query | `SignedQuery` |
//! | `UnsubscribeEvent` | Remove subscription | `Ack` |
//! | `WriteExternalState` | Verify, record, resolve, apply | `Ack` |
//! | `OpenSession` / `PerformLock` / `CreateAsset` | State machine | `Ack` |
//! | `Extinguish` / `AssignAsset` / `Claim` | State machine | `Ack` |
//! | `SessionStatus` | Snapshot | `SessionStatusSnapshot` |
//!
//! ## Module Structure
//!
//! ```text
//! ix-04-driver/
//! ├── domain/          # DriverConfig, errors, pending view store
//! ├── algorithms/      # retry backoff, ack mapping
//! ├── ports/           # EnvelopeHandler, DriverTransport
//! ├── adapters/        # InMemoryNetwork
//! ├── client.rs        # DriverClient
//! ├── server.rs        # DriverServer
//! ├── delivery.rs      # DeliveryWorker
//! └── node.rs          # DriverNode wiring
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod client;
pub mod delivery;
pub mod domain;
pub mod node;
pub mod ports;
pub mod server;

// Re-exports
pub use adapters::InMemoryNetwork;
pub use algorithms::{ack_for_outcome, backoff_for_attempt, view_key_for};
pub use client::DriverClient;
pub use delivery::DeliveryWorker;
pub use domain::{
    ConfigError, DeliveryConfig, DriverConfig, DriverError, NotaryConfig, PendingCancel,
    PendingView, PendingViews, RetryPolicy, TimeoutConfig, TransportError, ENV_PREFIX,
};
pub use node::{DriverNode, DriverNodeBuilder};
pub use ports::{DriverTransport, EnvelopeHandler};
pub use server::{DriverServer, STATE_QUERY_EVENT};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
