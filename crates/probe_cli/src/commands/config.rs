//! Effective configuration command.

use anyhow::{Context, Result};
use console::style;
use std::path::Path;

/// Print the effective configuration, or write it to `config_path`.
pub fn run(config_path: &Path, write: bool) -> Result<()> {
    let config = super::load_config(config_path)?;

    if write {
        config
            .save(config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!(
            "{} Wrote configuration to {}",
            style("✓").green(),
            config_path.display()
        );
        return Ok(());
    }

    print!("{}", config.to_toml()?);
    Ok(())
}
