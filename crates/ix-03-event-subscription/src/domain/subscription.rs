//! # Subscriptions
//!
//! A registered `EventSubscriptionSpec` plus what the manager needs to
//! route and tear it down.

use serde::{Deserialize, Serialize};
use shared_types::{DeliveryTarget, DriverId, EventSubscriptionSpec, Query, SessionId};

/// Subscription manager configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionConfig {
    /// Maximum live subscriptions per owning session.
    pub max_per_owner: usize,
    /// How long a delivered event key is remembered.
    pub dedup_window_secs: u64,
    /// Bound on remembered event keys.
    pub dedup_max_entries: usize,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            max_per_owner: 64,
            dedup_window_secs: 600,
            dedup_max_entries: 10_000,
        }
    }
}

/// A live subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventSubscription {
    /// Deterministic id derived from `(query, target)`.
    pub id: String,
    /// What was registered.
    pub spec: EventSubscriptionSpec,
    /// Registration time, unix seconds.
    pub created_at: u64,
}

impl EventSubscription {
    /// Register `spec` at `now`.
    pub fn new(spec: EventSubscriptionSpec, now: u64) -> Self {
        Self {
            id: spec.subscription_id(),
            spec,
            created_at: now,
        }
    }

    /// Session notifications are delivered under.
    ///
    /// A session target wins, then the owner. Callback subscriptions without
    /// an owner use the subscription id so the receiver still has a key.
    pub fn session_id(&self) -> SessionId {
        match (&self.spec.target, &self.spec.owner) {
            (DeliveryTarget::Session(id), _) => id.clone(),
            (DeliveryTarget::Callback(_), Some(owner)) => owner.clone(),
            (DeliveryTarget::Callback(_), None) => SessionId::new(self.id.clone()),
        }
    }

    /// Sessions whose terminal state tears this subscription down: the
    /// owner and a session target, without repeats.
    pub fn bound_sessions(&self) -> Vec<SessionId> {
        let mut bound = Vec::with_capacity(2);
        if let Some(owner) = &self.spec.owner {
            bound.push(owner.clone());
        }
        if let DeliveryTarget::Session(id) = &self.spec.target {
            if !bound.contains(id) {
                bound.push(id.clone());
            }
        }
        bound
    }

    /// Whether the subscription lives and dies with `session`.
    pub fn is_bound_to(&self, session: &SessionId) -> bool {
        self.spec.owner.as_ref() == Some(session)
            || matches!(&self.spec.target, DeliveryTarget::Session(id) if id == session)
    }

    /// Query descriptor a remote driver can present to verify the
    /// subscription; unsigned until a notary signs it.
    pub fn to_query(&self, requesting_driver: DriverId, nonce: impl Into<String>) -> Query {
        let query = &self.spec.query;
        Query {
            request_id: self.id.clone(),
            session_id: self.session_id(),
            requesting_driver,
            target: query.ledger.clone(),
            address: format!(
                "event:{}/{}",
                query.contract_address.as_deref().unwrap_or("*"),
                query.event_name.as_deref().unwrap_or("*")
            ),
            nonce: nonce.into(),
            signature: None,
            certificate: None,
        }
    }
}
