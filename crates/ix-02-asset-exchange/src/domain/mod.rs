//! # Domain Module
//!
//! Core domain types for the Asset State Machine.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod preimage;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use preimage::{Preimage, MAX_PREIMAGE_LEN};
pub use value_objects::*;
