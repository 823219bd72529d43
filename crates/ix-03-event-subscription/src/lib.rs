//! # IX-03 Event Subscription Manager
//!
//! Standing registrations for remote ledger events. Matching events become
//! notifications on the shared bus, delivered at-least-once to a local
//! session or a remote driver.
//!
//! **Component ID:** 3
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Lifecycle
//!
//! | Trigger | Effect |
//! |---------|--------|
//! | `subscribe(spec)` | Registered under `spec.subscription_id()`; repeats return the same id |
//! | `RemoteEventObserved` | One `Notification` per matching subscription |
//! | `SessionTerminal` | Subscriptions owned by or targeting the session removed |
//! | `unsubscribe(id)` | Removed |
//!
//! Targets drop redeliveries with [`NotificationDedup`], keyed by target and
//! the emitting `ContractTransaction`.
//!
//! ## Module Structure
//!
//! ```text
//! ix-03-event-subscription/
//! ├── domain/          # EventSubscription, SubscriptionConfig, errors
//! ├── algorithms/      # matching, notification construction, dedup keys
//! ├── ports/           # EventSubscriptionApi, EventPublisher
//! ├── adapters/        # NotificationDedup
//! └── service.rs       # SubscriptionManager
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::NotificationDedup;
pub use algorithms::{build_notification, delivery_key, matching_subscriptions};
pub use domain::{EventSubscription, EventSubscriptionError, SubscriptionConfig};
pub use ports::EventSubscriptionApi;
pub use service::SubscriptionManager;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
