//! # Node Runtime Library
//!
//! Wiring for the `node-runtime` binary, exposed for testing.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (TOML file, then `IX_*` environment overrides)
//! 2. Validate it (master secret length, timeouts, trust anchors)
//! 3. Build the driver node and attach it to the transport
//! 4. Start background tasks (subscription listener, delivery worker, sweeper)
//! 5. Run until Ctrl+C, then shut down

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod runtime;

pub use config::{config_path, load_config, CONFIG_ENV};
pub use runtime::NodeRuntime;
