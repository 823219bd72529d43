//! # Ports Module

pub mod inbound;
pub mod outbound;

pub use inbound::EnvelopeHandler;
pub use outbound::DriverTransport;
