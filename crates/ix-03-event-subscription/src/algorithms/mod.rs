//! # Algorithms
//!
//! Event matching and notification construction.

pub mod matching;

pub use matching::{build_notification, delivery_key, matching_subscriptions};
