//! # Error Types
//!
//! Defines error types used across driver crates.

use thiserror::Error;

/// Errors related to envelope verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// Envelope version not supported.
    #[error("Unsupported version: received {received}, supported {supported}")]
    UnsupportedVersion { received: u16, supported: u16 },

    /// Message type tag not present in the schema registry.
    #[error("Unknown message type tag: {tag}")]
    UnknownMessageType { tag: u16 },

    /// Timestamp outside valid window.
    #[error("Timestamp out of range: {timestamp} not within valid window (now {now})")]
    TimestampOutOfRange { timestamp: u64, now: u64 },

    /// Replay attack detected.
    #[error("Replay detected: nonce {nonce} already seen")]
    ReplayDetected { nonce: String },

    /// Invalid seal.
    #[error("Invalid seal")]
    InvalidSeal,

    /// No shared key for the sender.
    #[error("Unknown sender: {sender}")]
    UnknownSender { sender: String },

    /// Envelope addressed to another driver.
    #[error("Misrouted envelope: addressed to {recipient}, received by {local}")]
    Misrouted { recipient: String, local: String },

    /// Payload could not be (de)serialized.
    #[error("Codec error: {0}")]
    Codec(String),
}

impl From<bincode::Error> for MessageError {
    fn from(e: bincode::Error) -> Self {
        MessageError::Codec(e.to_string())
    }
}
