//! # Algorithms Module
//!
//! Retry backoff and acknowledgement mapping.

pub mod ack;
pub mod retry;

pub use ack::{ack_for_outcome, view_key_for};
pub use retry::{backoff_for_attempt, should_retry};
