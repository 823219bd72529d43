//! Inbound port: the operations drivers call on the subscription manager.

use crate::domain::{EventSubscription, EventSubscriptionError};
use async_trait::async_trait;
use shared_types::{ContractTransaction, DriverId, EventSubscriptionSpec, Query, SessionId};

/// Subscription manager API.
#[async_trait]
pub trait EventSubscriptionApi: Send + Sync {
    /// Register `spec`. Returns the subscription id and whether it was new;
    /// an identical `(query, target)` returns the existing id.
    fn subscribe(&self, spec: EventSubscriptionSpec)
        -> Result<(String, bool), EventSubscriptionError>;

    /// Remove a subscription.
    fn unsubscribe(&self, subscription_id: &str)
        -> Result<EventSubscription, EventSubscriptionError>;

    /// Look up a subscription.
    fn get(&self, subscription_id: &str) -> Option<EventSubscription>;

    /// Unsigned query descriptor for a subscription.
    fn query_for(
        &self,
        subscription_id: &str,
        requesting_driver: DriverId,
        nonce: String,
    ) -> Result<Query, EventSubscriptionError>;

    /// Fan a remote event out to every matching subscription. Returns the
    /// number of notifications published.
    async fn on_remote_event(&self, view_payload: &[u8], ctx: &ContractTransaction) -> usize;

    /// Drop every subscription bound to `session`. Returns how many went.
    fn teardown_session(&self, session: &SessionId) -> usize;
}
