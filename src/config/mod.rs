pub use bf_core::config::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    check_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./bookforged.toml",
        "./config.toml",
        "~/.config/bookforged/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Reject configurations that cannot work.
pub fn check_config(config: &Config) -> Result<()> {
    let hours = config.split.limit_hours;
    if !hours.is_finite() || hours <= 0.0 {
        anyhow::bail!("split.limit_hours must be a positive number, got {hours}");
    }
    Ok(())
}

/// [`check_config`], then log the merely suspicious settings.
///
/// Call once, on the final config after command-line overrides.
pub fn validate_config(config: &Config) -> Result<()> {
    check_config(config)?;

    for warning in config.validate() {
        tracing::warn!("{warning}");
    }

    Ok(())
}
