//! # Inbound Ports
//!
//! What a driver exposes to the network: one entry point taking a sealed
//! request envelope and returning a sealed response envelope.

use crate::domain::TransportError;
use async_trait::async_trait;
use shared_types::DriverEnvelope;

/// Server side of the driver protocol.
///
/// Rejections are answered with a sealed error `Ack`; `Err` is reserved for
/// failures where no response can be produced at all.
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    /// Handle one request envelope.
    async fn handle(&self, envelope: DriverEnvelope) -> Result<DriverEnvelope, TransportError>;
}
