//! # Subscription Manager
//!
//! Subscription table, fan-out of remote events onto the bus, and teardown
//! when a bound session ends.

use crate::algorithms::{build_notification, matching_subscriptions};
use crate::domain::{EventSubscription, EventSubscriptionError, SubscriptionConfig};
use crate::ports::{EventPublisher, EventSubscriptionApi};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, InteropEvent};
use shared_types::{
    current_timestamp, ContractTransaction, DriverId, EventSubscriptionSpec, Query, SessionId,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Subscription manager.
pub struct SubscriptionManager {
    /// All live subscriptions by id
    subscriptions: DashMap<String, EventSubscription>,
    /// Subscription ids by bound session
    by_session: DashMap<SessionId, Vec<String>>,
    /// Where notifications go
    publisher: Arc<dyn EventPublisher>,
    config: SubscriptionConfig,
}

impl SubscriptionManager {
    /// Create a manager publishing notifications to `publisher`.
    pub fn new(publisher: Arc<dyn EventPublisher>, config: SubscriptionConfig) -> Self {
        Self {
            subscriptions: DashMap::new(),
            by_session: DashMap::new(),
            publisher,
            config,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    /// Live subscriptions bound to `session`.
    pub fn session_subscriptions(&self, session: &SessionId) -> Vec<EventSubscription> {
        self.by_session
            .get(session)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.subscriptions.get(id).map(|r| r.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total live subscriptions.
    pub fn total_subscriptions(&self) -> usize {
        self.subscriptions.len()
    }

    /// Listen on the bus: remote events fan out, terminal sessions tear
    /// their subscriptions down. Ends when the bus is dropped.
    pub fn spawn(self: &Arc<Self>, bus: &InMemoryEventBus) -> JoinHandle<()> {
        let mut events = bus.subscribe(EventFilter::topics(vec![
            EventTopic::Ledger,
            EventTopic::Session,
        ]));
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            info!("[ix-03] Subscription listener started");
            while let Some(event) = events.recv().await {
                match event {
                    InteropEvent::RemoteEventObserved { view_payload, ctx } => {
                        manager.on_remote_event(&view_payload, &ctx).await;
                    }
                    InteropEvent::SessionTerminal {
                        session_id, state, ..
                    } => {
                        let removed = manager.teardown_session(&session_id);
                        if removed > 0 {
                            info!(
                                "[ix-03] Session {} reached {}; removed {} subscription(s)",
                                session_id, state, removed
                            );
                        }
                    }
                    _ => {}
                }
            }
            info!("[ix-03] Subscription listener stopped");
        })
    }

    fn unindex(&self, subscription: &EventSubscription, skip: Option<&SessionId>) {
        for session in subscription.bound_sessions() {
            if Some(&session) == skip {
                continue;
            }
            if let Some(mut ids) = self.by_session.get_mut(&session) {
                ids.retain(|id| id != &subscription.id);
            }
            self.by_session.remove_if(&session, |_, ids| ids.is_empty());
        }
    }
}

#[async_trait]
impl EventSubscriptionApi for SubscriptionManager {
    fn subscribe(
        &self,
        spec: EventSubscriptionSpec,
    ) -> Result<(String, bool), EventSubscriptionError> {
        let subscription = EventSubscription::new(spec, current_timestamp());
        let id = subscription.id.clone();
        let bound = subscription.bound_sessions();

        if self.subscriptions.contains_key(&id) {
            debug!(subscription_id = %id, "[ix-03] Subscription already registered");
            return Ok((id, false));
        }

        for session in &bound {
            let held = self.by_session.get(session).map_or(0, |ids| ids.len());
            if held >= self.config.max_per_owner {
                return Err(EventSubscriptionError::LimitReached {
                    owner: session.clone(),
                    limit: self.config.max_per_owner,
                });
            }
        }

        match self.subscriptions.entry(id.clone()) {
            Entry::Occupied(_) => return Ok((id, false)),
            Entry::Vacant(slot) => {
                slot.insert(subscription);
            }
        }
        for session in bound {
            self.by_session.entry(session).or_default().push(id.clone());
        }

        debug!(subscription_id = %id, "[ix-03] Created subscription");
        Ok((id, true))
    }

    fn unsubscribe(
        &self,
        subscription_id: &str,
    ) -> Result<EventSubscription, EventSubscriptionError> {
        let (_, subscription) = self
            .subscriptions
            .remove(subscription_id)
            .ok_or_else(|| EventSubscriptionError::NotFound(subscription_id.to_string()))?;
        self.unindex(&subscription, None);

        debug!(subscription_id = %subscription_id, "[ix-03] Removed subscription");
        Ok(subscription)
    }

    fn get(&self, subscription_id: &str) -> Option<EventSubscription> {
        self.subscriptions.get(subscription_id).map(|r| r.clone())
    }

    fn query_for(
        &self,
        subscription_id: &str,
        requesting_driver: DriverId,
        nonce: String,
    ) -> Result<Query, EventSubscriptionError> {
        self.get(subscription_id)
            .map(|sub| sub.to_query(requesting_driver, nonce))
            .ok_or_else(|| EventSubscriptionError::NotFound(subscription_id.to_string()))
    }

    async fn on_remote_event(&self, view_payload: &[u8], ctx: &ContractTransaction) -> usize {
        // Snapshot so no map guard is held across the publish await
        let snapshot: Vec<EventSubscription> =
            self.subscriptions.iter().map(|r| r.value().clone()).collect();
        let matched = matching_subscriptions(&snapshot, ctx);

        debug!(
            ledger = %ctx.ledger,
            event = %ctx.event_name,
            tx_id = %ctx.tx_id,
            matched = matched.len(),
            "[ix-03] Remote event observed"
        );

        for subscription in &matched {
            let notification = build_notification(subscription, view_payload, ctx);
            self.publisher
                .publish(InteropEvent::Notification(notification))
                .await;
        }
        matched.len()
    }

    fn teardown_session(&self, session: &SessionId) -> usize {
        let Some((_, ids)) = self.by_session.remove(session) else {
            return 0;
        };

        let mut removed = 0;
        for id in ids {
            if let Some((_, subscription)) = self.subscriptions.remove(&id) {
                self.unindex(&subscription, Some(session));
                removed += 1;
            }
        }

        debug!(session_id = %session, removed, "[ix-03] Tore down session subscriptions");
        removed
    }
}
