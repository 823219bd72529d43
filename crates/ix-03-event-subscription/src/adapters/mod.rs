//! # Adapters

pub mod dedup;

pub use dedup::NotificationDedup;
