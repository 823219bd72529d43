//! # Outbound Ports
//!
//! How a driver reaches its peers.

use crate::domain::TransportError;
use async_trait::async_trait;
use shared_types::DriverEnvelope;

/// Carries a sealed request to `envelope.recipient` and returns its
/// response. Deadlines are enforced by the caller.
#[async_trait]
pub trait DriverTransport: Send + Sync {
    /// Send one request and wait for the response.
    async fn send(&self, envelope: DriverEnvelope) -> Result<DriverEnvelope, TransportError>;
}
