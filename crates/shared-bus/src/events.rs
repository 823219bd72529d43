//! # Interop Events
//!
//! Every event that flows through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::entities::{
    ContractTransaction, DeliveryTarget, SessionId, SessionState,
};

/// A matched remote event on its way to a delivery target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Subscription that matched.
    pub subscription_id: String,
    /// Where the notification goes.
    pub target: DeliveryTarget,
    /// Session the notification is delivered under.
    pub session_id: SessionId,
    /// Encoded View carried by the event.
    pub view_payload: Vec<u8>,
    /// Transaction that emitted the event (dedup key).
    pub ctx: ContractTransaction,
}

/// All events that can be published to the event bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteropEvent {
    // =========================================================================
    // LEDGER CONNECTOR
    // =========================================================================
    /// A remote ledger emitted an event, already encoded as a View.
    RemoteEventObserved {
        /// Encoded View.
        view_payload: Vec<u8>,
        /// Transaction that emitted the event.
        ctx: ContractTransaction,
    },

    // =========================================================================
    // EVENT SUBSCRIPTIONS (ix-03)
    // =========================================================================
    /// A remote event matched a subscription.
    Notification(Notification),

    // =========================================================================
    // ASSET EXCHANGE (ix-02)
    // =========================================================================
    /// A session moved along an edge.
    SessionTransitioned {
        /// Session.
        session_id: SessionId,
        /// Previous state.
        from: SessionState,
        /// New state.
        to: SessionState,
    },

    /// A session reached a terminal state.
    SessionTerminal {
        /// Session.
        session_id: SessionId,
        /// Terminal state.
        state: SessionState,
        /// Why the session ended.
        reason: String,
    },

    // =========================================================================
    // DEAD LETTERS
    // =========================================================================
    /// A notification could not be delivered after all retries.
    DeliveryFailed {
        /// The undelivered notification.
        notification: Notification,
        /// Last delivery error.
        error: String,
    },
}

impl InteropEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::RemoteEventObserved { .. } => EventTopic::Ledger,
            Self::Notification(_) => EventTopic::Notification,
            Self::SessionTransitioned { .. } | Self::SessionTerminal { .. } => EventTopic::Session,
            Self::DeliveryFailed { .. } => EventTopic::DeadLetterQueue,
        }
    }

    /// Get the originating component (0 = ledger connector).
    #[must_use]
    pub fn source_component(&self) -> u8 {
        match self {
            Self::RemoteEventObserved { .. } => 0,
            Self::SessionTransitioned { .. } | Self::SessionTerminal { .. } => 2,
            Self::Notification(_) => 3,
            Self::DeliveryFailed { .. } => 4,
        }
    }

    /// Session the event concerns, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Self::RemoteEventObserved { .. } => None,
            Self::Notification(n) | Self::DeliveryFailed { notification: n, .. } => {
                Some(&n.session_id)
            }
            Self::SessionTransitioned { session_id, .. }
            | Self::SessionTerminal { session_id, .. } => Some(session_id),
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Remote ledger events.
    Ledger,
    /// Subscription notifications.
    Notification,
    /// Session lifecycle.
    Session,
    /// Undeliverable notifications.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Source components to include. Empty means all sources.
    pub source_components: Vec<u8>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            source_components: Vec::new(),
        }
    }

    /// Create a filter for events from specific components.
    #[must_use]
    pub fn from_components(components: Vec<u8>) -> Self {
        Self {
            topics: Vec::new(),
            source_components: components,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &InteropEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let source_match = self.source_components.is_empty()
            || self.source_components.contains(&event.source_component());

        topic_match && source_match
    }
}
