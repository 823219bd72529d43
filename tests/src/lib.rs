//! # Relay Interop Test Suite
//!
//! Cross-crate flows between two (sometimes three) drivers on one
//! in-memory network.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Driver fixtures, lock terms, event views
//! └── integration/
//!     ├── asset_exchange_flows.rs  # Lock, create, claim, assign; expiry
//!     ├── state_requests.rs        # RequestDriverState deadlines and cancel
//!     ├── subscriptions.rs         # Remote events feeding local sessions
//!     └── failure_modes.rs         # Retries, mismatches, untrusted views
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ix-tests
//! cargo test -p ix-tests integration::subscriptions::
//! ```

pub mod harness;
pub mod integration;
