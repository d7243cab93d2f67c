//! Configuration loading and the `config` command.

use sluice::{DispatchConfig, SluiceResult};
use std::path::Path;
use tracing::debug;

/// Load configuration from `path`, or from the default locations.
pub fn load_config(path: Option<&Path>) -> SluiceResult<DispatchConfig> {
    match path {
        Some(path) => DispatchConfig::from_file(path),
        None => DispatchConfig::load(),
    }
}

/// Print the effective configuration as TOML.
pub fn show_config(config: &DispatchConfig) -> SluiceResult<()> {
    debug!("Rendering effective configuration");
    print!("{}", config.to_toml()?);
    Ok(())
}
