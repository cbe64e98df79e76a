use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use vulnscan_core::AppConfig;

/// Environment overrides use this prefix and `__` between nested keys,
/// e.g. `VULNSCAN_TOOLS__NMAP` or `VULNSCAN_REPORT__FORMAT`.
const ENV_PREFIX: &str = "VULNSCAN";

/// Layer the optional config file under `VULNSCAN_*` environment variables.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let settings = Config::builder()
        .add_source(File::from(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    settings
        .try_deserialize()
        .with_context(|| format!("invalid configuration in {}", path.display()))
}
