//! # Algorithms Module
//!
//! Hash-lock checks and transition planning.

pub mod hash_lock;
pub mod transitions;

pub use hash_lock::{create_hash_lock, generate_preimage, is_elapsed, verify_claim, verify_preimage};
pub use transitions::{apply_asset_effects, asset_status_on_entry, plan, Step};
