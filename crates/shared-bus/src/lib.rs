//! # Shared Bus - In-Process Event Bus for Driver Components
//!
//! Carries asynchronous events between the components of one driver node:
//! remote ledger events observed by the connector, subscription
//! notifications, and session lifecycle events.
//!
//! ## Choreography
//!
//! ```text
//! ┌──────────────┐  RemoteEventObserved   ┌──────────────────────┐
//! │ Ledger watch │ ─────────────────────▶ │ ix-03 subscriptions  │
//! └──────────────┘                        └──────────┬───────────┘
//!                                                    │ Notification
//!                                                    ▼
//! ┌──────────────┐  SessionTerminal       ┌──────────────────────┐
//! │ ix-02 assets │ ─────────────────────▶ │ ix-04 delivery       │
//! └──────────────┘  (teardown)            └──────────────────────┘
//! ```
//!
//! ## Delivery
//!
//! - Notifications are delivered at-least-once; targets dedup with
//!   `TimeBoundedDedupCache` keyed by the contract context digest.
//! - Failed deliveries are published as `DeliveryFailed` on the dead letter topic.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod dedup_cache;
pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use dedup_cache::{DedupError, TimeBoundedDedupCache};
pub use events::{EventFilter, EventTopic, InteropEvent, Notification};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
