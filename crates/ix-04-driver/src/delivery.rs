//! # Notification Delivery
//!
//! Drains `Notification` events from the bus and delivers each one
//! at-least-once: local session targets through the server, callback
//! targets through the client as `WriteExternalState`. Retryable failures
//! are retried with backoff; the rest, and notifications that exhaust
//! their attempts, go to the dead letter topic as `DeliveryFailed`.

use crate::algorithms::backoff_for_attempt;
use crate::client::DriverClient;
use crate::domain::{DeliveryConfig, DriverError};
use crate::server::DriverServer;
use shared_bus::{EventFilter, EventPublisher, EventTopic, InMemoryEventBus, InteropEvent, Notification};
use shared_types::{Ack, DeliveryTarget, WriteExternalStateMessage};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delivers notifications to their targets.
pub struct DeliveryWorker {
    server: Arc<DriverServer>,
    client: Arc<DriverClient>,
    publisher: Arc<dyn EventPublisher>,
    config: DeliveryConfig,
}

impl DeliveryWorker {
    /// Create a worker
    pub fn new(
        server: Arc<DriverServer>,
        client: Arc<DriverClient>,
        publisher: Arc<dyn EventPublisher>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            server,
            client,
            publisher,
            config,
        }
    }

    /// Listen on `bus`; one task per notification so a slow target does
    /// not hold up the others.
    pub fn spawn(self: &Arc<Self>, bus: &InMemoryEventBus) -> JoinHandle<()> {
        let mut events = bus.subscribe(EventFilter::topics(vec![EventTopic::Notification]));
        let worker = Arc::clone(self);

        tokio::spawn(async move {
            info!("[ix-04] Delivery worker started");
            while let Some(event) = events.recv().await {
                if let InteropEvent::Notification(notification) = event {
                    let worker = Arc::clone(&worker);
                    tokio::spawn(async move {
                        worker.deliver(notification).await;
                    });
                }
            }
            info!("[ix-04] Delivery worker stopped");
        })
    }

    /// Deliver one notification, retrying per policy. Returns whether it
    /// was delivered.
    pub async fn deliver(&self, notification: Notification) -> bool {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let error = match self.attempt(&notification).await {
                Ok(ack) => {
                    debug!(
                        subscription_id = %notification.subscription_id,
                        tx_id = %notification.ctx.tx_id,
                        attempt,
                        result = ?ack.message,
                        "[ix-04] Notification delivered"
                    );
                    return true;
                }
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= max_attempts {
                warn!(
                    subscription_id = %notification.subscription_id,
                    session_id = %notification.session_id,
                    tx_id = %notification.ctx.tx_id,
                    attempt,
                    error = %error,
                    "[ix-04] Notification undeliverable"
                );
                self.publisher
                    .publish(InteropEvent::DeliveryFailed {
                        notification,
                        error: error.to_string(),
                    })
                    .await;
                return false;
            }

            let backoff = backoff_for_attempt(&self.config.retry, attempt - 1);
            debug!(
                subscription_id = %notification.subscription_id,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "[ix-04] Retrying notification"
            );
            tokio::time::sleep(backoff).await;
        }
    }

    async fn attempt(&self, notification: &Notification) -> Result<Ack, DriverError> {
        match &notification.target {
            DeliveryTarget::Session(_) => self.server.deliver_local(notification).await,
            DeliveryTarget::Callback(driver) => {
                let message = WriteExternalStateMessage {
                    session_id: notification.session_id.clone(),
                    view_payload: notification.view_payload.clone(),
                    ctx: notification.ctx.clone(),
                    request_id: None,
                    subscription_id: Some(notification.subscription_id.clone()),
                };
                self.client.write_external_state(driver, message).await
            }
        }
    }
}
