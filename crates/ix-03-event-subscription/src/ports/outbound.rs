//! Outbound port.
//!
//! Notifications leave the manager as `InteropEvent::Notification` on the
//! shared bus; delivery workers subscribed to that topic carry them to
//! their targets and retry until acknowledged.

pub use shared_bus::EventPublisher;
