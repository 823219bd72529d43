//! # Domain Layer
//!
//! Subscriptions, configuration and errors.

pub mod errors;
pub mod subscription;

pub use errors::*;
pub use subscription::*;
