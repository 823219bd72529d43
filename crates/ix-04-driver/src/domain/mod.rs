//! Driver domain: configuration, errors and the pending view store.

pub mod config;
pub mod errors;
pub mod pending;

pub use config::{
    ConfigError, DeliveryConfig, DriverConfig, NotaryConfig, RetryPolicy, TimeoutConfig,
    ENV_PREFIX,
};
pub use errors::{DriverError, TransportError};
pub use pending::{PendingCancel, PendingStats, PendingView, PendingViews};
