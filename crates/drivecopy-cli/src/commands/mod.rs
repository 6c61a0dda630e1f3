//! CLI subcommands

pub mod auth;
pub mod transfer;

use std::path::Path;

use anyhow::{bail, Context, Result};
use drivecopy_core::config::Config;
use tracing::debug;

/// Loads the config from `path`, or from the default location if it exists
///
/// An explicit path must exist. Invalid settings are reported together.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let default = Config::default_path();
            if default.exists() {
                Config::load(&default)
                    .with_context(|| format!("Failed to load config from {}", default.display()))?
            } else {
                debug!(path = %default.display(), "No config file, using defaults");
                Config::default()
            }
        }
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!("Invalid configuration:\n  {}", details.join("\n  "));
    }
    Ok(config)
}
