//! # Ports Layer
//!
//! Inbound: what the codec offers. Outbound: signature scheme plug-ins.

pub mod inbound;
pub mod outbound;

pub use inbound::ViewCodecApi;
pub use outbound::SignatureVerifier;
