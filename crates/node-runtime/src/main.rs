//! # Relay Driver Runtime
//!
//! Runs one driver node.
//!
//! ```text
//! node-runtime [CONFIG.toml]
//! ```
//!
//! The config path may also come from `IX_CONFIG`. Any `IX_*` variable listed
//! in `DriverConfig::apply_overrides` overrides the file. Log filtering
//! follows `RUST_LOG` (default `info`).

use anyhow::Result;
use node_runtime::{config_path, load_config, NodeRuntime};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let vars: Vec<(String, String)> = std::env::vars().collect();
    let path = config_path(std::env::args(), &vars);
    let config = load_config(path.as_deref(), vars)?;

    let runtime = NodeRuntime::new(config)?;
    runtime.start();

    info!("Driver is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown();
    Ok(())
}
