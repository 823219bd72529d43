//! # `DriverEnvelope`
//!
//! The universal wrapper for ALL driver-to-driver traffic.
//!
//! ## Security Properties
//!
//! - **Versioning**: All envelopes include a `version` field.
//! - **Typed**: `message_type` is a schema registry tag; unknown tags are rejected.
//! - **Correlation**: A response reuses the request's `correlation_id`.
//! - **Time-Bounded Replay Prevention**: Nonces are only valid within the timestamp window.
//! - **Envelope Authority**: `sender` is the sole source of truth for identity.
//! - **Integrity**: `seal` is HMAC-SHA256 over header and payload bytes.

use crate::entities::DriverId;
use crate::errors::MessageError;
use crate::registry::schema_registry;
use crate::security::{current_timestamp, sign_message};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use uuid::Uuid;

/// Sealed envelope for driver messages.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverEnvelope {
    // =========================================================================
    // HEADER SECTION
    // =========================================================================
    /// Protocol version.
    pub version: u16,

    /// Schema registry tag of the payload type.
    pub message_type: u16,

    /// Sending driver. The ONLY source of truth for the caller's identity.
    pub sender: DriverId,

    /// Intended recipient driver.
    pub recipient: DriverId,

    /// Request id; responses echo it.
    pub correlation_id: Uuid,

    // =========================================================================
    // SECURITY SECTION
    // =========================================================================
    /// Unix seconds at creation.
    pub timestamp: u64,

    /// Replay-prevention nonce.
    pub nonce: Uuid,

    /// HMAC-SHA256 over `signing_bytes()`.
    #[serde_as(as = "Bytes")]
    pub seal: [u8; 32],

    // =========================================================================
    // PAYLOAD SECTION
    // =========================================================================
    /// bincode-encoded payload.
    pub payload: Vec<u8>,
}

#[derive(Serialize)]
struct SealedPart<'a> {
    version: u16,
    message_type: u16,
    sender: &'a DriverId,
    recipient: &'a DriverId,
    correlation_id: &'a Uuid,
    timestamp: u64,
    nonce: &'a Uuid,
    payload: &'a [u8],
}

impl DriverEnvelope {
    /// Current protocol version.
    pub const CURRENT_VERSION: u16 = 1;

    /// Build and seal an envelope around `payload`.
    pub fn seal<T: Serialize>(
        type_name: &str,
        sender: DriverId,
        recipient: DriverId,
        correlation_id: Uuid,
        payload: &T,
        key: &[u8],
    ) -> Result<Self, MessageError> {
        let schema = schema_registry()
            .by_name(type_name)
            .ok_or_else(|| MessageError::Codec(format!("unregistered message type {type_name}")))?;
        let mut envelope = Self {
            version: Self::CURRENT_VERSION,
            message_type: schema.tag,
            sender,
            recipient,
            correlation_id,
            timestamp: current_timestamp(),
            nonce: Uuid::new_v4(),
            seal: [0u8; 32],
            payload: bincode::serialize(payload)?,
        };
        envelope.seal = sign_message(&envelope.signing_bytes()?, key)?;
        Ok(envelope)
    }

    /// Seal a response to this envelope: same correlation id, roles swapped.
    pub fn reply<T: Serialize>(
        &self,
        type_name: &str,
        payload: &T,
        key: &[u8],
    ) -> Result<Self, MessageError> {
        Self::seal(
            type_name,
            self.recipient.clone(),
            self.sender.clone(),
            self.correlation_id,
            payload,
            key,
        )
    }

    /// Bytes covered by the seal.
    pub fn signing_bytes(&self) -> Result<Vec<u8>, MessageError> {
        let part = SealedPart {
            version: self.version,
            message_type: self.message_type,
            sender: &self.sender,
            recipient: &self.recipient,
            correlation_id: &self.correlation_id,
            timestamp: self.timestamp,
            nonce: &self.nonce,
            payload: &self.payload,
        };
        Ok(bincode::serialize(&part)?)
    }

    /// Decode the payload.
    pub fn open<T: DeserializeOwned>(&self) -> Result<T, MessageError> {
        Ok(bincode::deserialize(&self.payload)?)
    }

    /// Registry name of the payload type, if known.
    pub fn type_name(&self) -> Option<&'static str> {
        schema_registry().by_tag(self.message_type).map(|s| s.name)
    }

    /// Wire encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MessageError> {
        Ok(bincode::serialize(self)?)
    }

    /// Parse wire bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MessageError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
