//! Configuration file management for linewave.
//!
//! The configuration lives in `~/.config/linewave/linewave.toml` and is created
//! from the embedded default on first run (see `setup`).

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::render::render_loop::DEFAULT_FRAME_INTERVAL;
use crate::wave::{ConfigError, LineConfig, LineSettings, Rgb};

/// Drawing surface settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Color behind the lines
    pub background: Rgb,
    /// Minimum time between frames in milliseconds
    pub frame_interval_ms: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            background: Rgb::WHITE,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL.as_millis() as u64,
        }
    }
}

impl SurfaceConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Microphone volume source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `linewave list-devices`
    /// - device name from `linewave list-devices`
    pub device: String,
    /// Input level in dBFS that maps to `max_volume`
    pub reference_level_db: i8,
    /// Volume handed to the lines at the reference level
    pub max_volume: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: "default".to_string(),
            reference_level_db: -20,
            max_volume: 20.0,
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinewaveConfig {
    #[serde(default)]
    pub surface: SurfaceConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    /// Lines in draw order; empty means the default line
    #[serde(default)]
    pub lines: Vec<LineSettings>,
}

impl LinewaveConfig {
    /// Loads configuration from the user's config directory.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads configuration from an explicit path.
    ///
    /// # Errors
    /// - If the file cannot be read
    /// - If the TOML is malformed
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::info!(
            "Loaded config from {} ({} lines)",
            path.display(),
            config.lines.len()
        );
        Ok(config)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    /// - If the TOML is malformed or a value has the wrong type
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow!("Failed to parse config: {e}"))
    }

    /// Validates every configured line, in draw order.
    ///
    /// # Errors
    /// - `ConfigError::Line` naming the first line that fails validation
    pub fn line_configs(&self) -> Result<Vec<LineConfig>, ConfigError> {
        self.lines
            .iter()
            .enumerate()
            .map(|(index, settings)| {
                settings.clone().build().map_err(|source| ConfigError::Line {
                    index,
                    source: Box::new(source),
                })
            })
            .collect()
    }
}

/// Path of the config file. The parent directory is created if missing.
///
/// # Errors
/// - If the home directory cannot be determined
/// - If the config directory cannot be created
pub fn config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow!("Could not determine home directory"))?
        .join(".config")
        .join("linewave");

    fs::create_dir_all(&config_dir)
        .map_err(|e| anyhow!("Failed to create config directory: {e}"))?;

    Ok(config_dir.join("linewave.toml"))
}
