//! CLI commands.

pub mod config;
pub mod endpoints;
pub mod run;

use anyhow::{Context, Result};
use probe_core::Config;
use std::path::Path;

/// Loads `path` (defaults when missing) and applies the URL overrides from the environment.
pub fn load_config(path: &Path) -> Result<Config> {
    Config::load_with_env(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}
