//! # Domain Module
//!
//! Errors and trust anchors for the view codec.

pub mod errors;
pub mod trust;

pub use errors::DecodeError;
pub use trust::{TrustAnchor, TrustStore, TrustedKey};
