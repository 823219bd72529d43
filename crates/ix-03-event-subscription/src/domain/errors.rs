//! Event subscription errors.

use shared_types::SessionId;
use thiserror::Error;

/// Errors raised by the subscription manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventSubscriptionError {
    /// No subscription with this id.
    #[error("Subscription not found: {0}")]
    NotFound(String),

    /// The owning session already holds the maximum number of subscriptions.
    #[error("Session {owner} reached the subscription limit ({limit})")]
    LimitReached {
        /// Owning session
        owner: SessionId,
        /// Configured limit
        limit: usize,
    },
}
