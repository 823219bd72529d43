//! # In-Memory Network
//!
//! Routes sealed envelopes between drivers living in one process. Every
//! envelope is serialized to wire bytes and parsed again on each hop, so
//! the codec runs exactly as it would over a socket.
//!
//! Fault injection for tests:
//!
//! - `partition` makes a driver unreachable in both directions
//! - `drop_responses` lets the handler run but loses its response
//! - `set_latency` delays every request

use crate::domain::TransportError;
use crate::ports::{DriverTransport, EnvelopeHandler};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{DriverEnvelope, DriverId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace};

/// Process-local envelope router.
#[derive(Default)]
pub struct InMemoryNetwork {
    handlers: RwLock<HashMap<DriverId, Weak<dyn EnvelopeHandler>>>,
    partitioned: RwLock<HashSet<DriverId>>,
    dropped_responses: RwLock<HashMap<DriverId, u32>>,
    latency: RwLock<Option<Duration>>,
    delivered: AtomicU64,
}

impl InMemoryNetwork {
    /// Create an empty network
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Route envelopes addressed to `driver` to `handler`. The network
    /// holds a weak reference; dropping the handler disconnects it.
    pub fn register(&self, driver: DriverId, handler: Weak<dyn EnvelopeHandler>) {
        debug!(driver = %driver, "[ix-04] Driver joined network");
        self.handlers.write().insert(driver, handler);
    }

    /// Remove `driver` from the network.
    pub fn disconnect(&self, driver: &DriverId) -> bool {
        self.handlers.write().remove(driver).is_some()
    }

    /// Cut `driver` off until `heal`.
    pub fn partition(&self, driver: &DriverId) {
        self.partitioned.write().insert(driver.clone());
    }

    /// Undo `partition`.
    pub fn heal(&self, driver: &DriverId) {
        self.partitioned.write().remove(driver);
    }

    /// Lose the next `count` responses from `driver`. The requests are
    /// still processed; the callers wait until their own deadline.
    pub fn drop_responses(&self, driver: &DriverId, count: u32) {
        self.dropped_responses.write().insert(driver.clone(), count);
    }

    /// Delay every request by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Requests handed to a handler so far
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    fn is_partitioned(&self, driver: &DriverId) -> bool {
        self.partitioned.read().contains(driver)
    }

    fn take_dropped_response(&self, driver: &DriverId) -> bool {
        let mut dropped = self.dropped_responses.write();
        match dropped.get_mut(driver) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn route(&self, driver: &DriverId) -> Option<Arc<dyn EnvelopeHandler>> {
        self.handlers.read().get(driver).and_then(Weak::upgrade)
    }
}

#[async_trait]
impl DriverTransport for InMemoryNetwork {
    async fn send(&self, envelope: DriverEnvelope) -> Result<DriverEnvelope, TransportError> {
        let recipient = envelope.recipient.clone();
        if self.is_partitioned(&recipient) || self.is_partitioned(&envelope.sender) {
            return Err(TransportError::Unreachable(recipient));
        }
        let handler = self
            .route(&recipient)
            .ok_or_else(|| TransportError::Unreachable(recipient.clone()))?;

        let wire = envelope.to_bytes()?;
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        trace!(recipient = %recipient, bytes = wire.len(), "[ix-04] Delivering request");
        let request = DriverEnvelope::from_bytes(&wire)?;
        self.delivered.fetch_add(1, Ordering::Relaxed);
        let response = handler.handle(request).await?;

        if self.take_dropped_response(&recipient) {
            debug!(recipient = %recipient, "[ix-04] Response dropped");
            return std::future::pending().await;
        }

        let wire = response.to_bytes()?;
        Ok(DriverEnvelope::from_bytes(&wire)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{Ack, DerivedKeyProvider, KeyProvider};
    use uuid::Uuid;

    struct EchoAck {
        key: Vec<u8>,
    }

    #[async_trait]
    impl EnvelopeHandler for EchoAck {
        async fn handle(&self, envelope: DriverEnvelope) -> Result<DriverEnvelope, TransportError> {
            Ok(envelope.reply("Ack", &Ack::ok_with("echo"), &self.key)?)
        }
    }

    fn request(to: &str) -> DriverEnvelope {
        let keys = DerivedKeyProvider::new(b"0123456789abcdef-master".to_vec());
        let key = keys.shared_secret(&DriverId::new("driver-a")).unwrap();
        DriverEnvelope::seal(
            "Ack",
            DriverId::new("driver-a"),
            DriverId::new(to),
            Uuid::new_v4(),
            &Ack::ok(),
            &key,
        )
        .unwrap()
    }

    fn network_with_b() -> (Arc<InMemoryNetwork>, Arc<dyn EnvelopeHandler>) {
        let network = InMemoryNetwork::new();
        let handler: Arc<dyn EnvelopeHandler> = Arc::new(EchoAck { key: vec![7u8; 32] });
        network.register(DriverId::new("driver-b"), Arc::downgrade(&handler));
        (network, handler)
    }

    #[tokio::test]
    async fn test_round_trip_keeps_correlation() {
        let (network, _handler) = network_with_b();
        let req = request("driver-b");
        let resp = network.send(req.clone()).await.unwrap();
        assert_eq!(resp.correlation_id, req.correlation_id);
        assert_eq!(resp.sender, DriverId::new("driver-b"));
        assert_eq!(resp.open::<Ack>().unwrap(), Ack::ok_with("echo"));
        assert_eq!(network.delivered(), 1);
    }

    #[tokio::test]
    async fn test_unknown_and_dropped_handlers_unreachable() {
        let (network, handler) = network_with_b();
        assert!(matches!(
            network.send(request("driver-c")).await,
            Err(TransportError::Unreachable(_))
        ));

        drop(handler);
        assert!(matches!(
            network.send(request("driver-b")).await,
            Err(TransportError::Unreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_partition_and_heal() {
        let (network, _handler) = network_with_b();
        network.partition(&DriverId::new("driver-a"));
        assert!(network.send(request("driver-b")).await.is_err());
        network.heal(&DriverId::new("driver-a"));
        assert!(network.send(request("driver-b")).await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_response_hangs_after_processing() {
        let (network, _handler) = network_with_b();
        network.drop_responses(&DriverId::new("driver-b"), 1);

        let lost =
            tokio::time::timeout(Duration::from_millis(50), network.send(request("driver-b"))).await;
        assert!(lost.is_err());
        assert_eq!(network.delivered(), 1);

        assert!(network.send(request("driver-b")).await.is_ok());
    }
}
