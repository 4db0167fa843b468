//! Configuration management for linewave.
//!
//! Loads the surface, audio and per-line settings from a TOML file in the
//! user's config directory and validates the lines before they are drawn.

pub mod file;

pub use file::{config_path, AudioConfig, LinewaveConfig, SurfaceConfig};
