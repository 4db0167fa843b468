//! First-run setup.
//!
//! Writes the embedded default configuration when the user has none yet.

use std::path::Path;

use crate::config::config_path;

/// Embedded default configuration template.
pub const DEFAULT_CONFIG: &str = include_str!("../../environments/linewave.toml");

/// Creates the config file from the default template if it is missing.
///
/// # Errors
/// Returns an error if the config directory cannot be determined or the file
/// cannot be written.
pub fn ensure_config() -> anyhow::Result<()> {
    let path = config_path()?;
    if write_default_config(&path)? {
        tracing::info!("Created default config at {}", path.display());
    }
    Ok(())
}

/// Writes the default config to `path` unless a file is already there.
///
/// Returns whether a file was written.
fn write_default_config(path: &Path) -> anyhow::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    Ok(true)
}
