//! RGB colors and color stops used by waveform gradients.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::line::ConfigError;

/// An opaque 8-bit-per-channel color.
///
/// Serialized as a `#rrggbb` hex string so it reads naturally in the TOML config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);
    pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb` (the leading `#` is optional).
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidColor(value.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| ConfigError::InvalidColor(value.to_string()))
        };

        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// Linear interpolation between two colors, `t` clamped to [0, 1].
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::parse(&value)
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

impl From<Rgb> for ratatui::style::Color {
    fn from(color: Rgb) -> Self {
        ratatui::style::Color::Rgb(color.r, color.g, color.b)
    }
}

/// A gradient control point: a color pinned at a relative position along the line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub position: f32,
    pub color: Rgb,
}

impl ColorStop {
    pub const fn new(position: f32, color: Rgb) -> Self {
        Self { position, color }
    }
}

/// Palette of the animated "wave" line.
pub fn wave_palette() -> Vec<ColorStop> {
    vec![
        ColorStop::new(0.0, Rgb::new(0x72, 0x8e, 0xff)),
        ColorStop::new(0.2, Rgb::new(0x6f, 0xd3, 0xea)),
        ColorStop::new(0.4, Rgb::new(0x59, 0x96, 0xff)),
        ColorStop::new(0.6, Rgb::new(0x3a, 0x68, 0xe6)),
        ColorStop::new(0.8, Rgb::new(0x5f, 0xa4, 0xff)),
        ColorStop::new(1.0, Rgb::new(0x55, 0x9d, 0xf7)),
    ]
}
