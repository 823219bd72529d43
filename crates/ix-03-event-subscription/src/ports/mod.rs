//! # Ports Layer
//!
//! - **Inbound (Driving)**: `EventSubscriptionApi`
//! - **Outbound (Driven)**: `EventPublisher` (the shared bus)

pub mod inbound;
pub mod outbound;

pub use inbound::EventSubscriptionApi;
pub use outbound::EventPublisher;
