//! Configuration loading for the runtime.

use anyhow::{Context, Result};
use ix_04_driver::DriverConfig;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming the config file when no path is given.
pub const CONFIG_ENV: &str = "IX_CONFIG";

/// Config path from the first CLI argument, else from `IX_CONFIG`.
pub fn config_path<I>(args: I, vars: &[(String, String)]) -> Option<PathBuf>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter().nth(1).map(PathBuf::from).or_else(|| {
        vars.iter()
            .find(|(name, _)| name == CONFIG_ENV)
            .map(|(_, value)| PathBuf::from(value))
    })
}

/// Load the file at `path` (defaults when `None`), apply `vars` as
/// overrides and validate.
pub fn load_config(path: Option<&Path>, vars: Vec<(String, String)>) -> Result<DriverConfig> {
    let mut config = match path {
        Some(path) => DriverConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            info!("No config file given, starting from defaults");
            DriverConfig::default()
        }
    };

    let applied = config
        .apply_overrides(vars)
        .context("Invalid environment override")?;
    for name in &applied {
        info!("Applied override {}", name);
    }

    config.validate().context("Invalid driver configuration")?;
    Ok(config)
}
