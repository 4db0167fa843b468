//! Waveform line model: validated per-line configuration and the sampled point buffer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::color::{wave_palette, ColorStop};
use super::generator;

/// Rejections raised when a line configuration is built.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("point_count must be at least 2, got {0}")]
    TooFewPoints(usize),

    #[error("a line needs at least 2 color stops, got {0}")]
    TooFewColorStops(usize),

    #[error("color stop {index} has position {position}, expected a value in [0, 1]")]
    StopOutOfRange { index: usize, position: f32 },

    #[error("color stop positions must be strictly increasing (stop {index} at {position})")]
    StopsNotIncreasing { index: usize, position: f32 },

    #[error("color stops must start at 0 and end at 1 (got {first}..{last})")]
    StopsDoNotSpanLine { first: f32, last: f32 },

    #[error("line_width must be positive, got {0}")]
    InvalidLineWidth(f32),

    #[error("{name} must be a finite number, got {value}")]
    NotFinite { name: &'static str, value: f32 },

    #[error("legacy envelope divisor must be positive, got {0}")]
    InvalidEnvelopeDivisor(f32),

    #[error("invalid color '{0}', expected #rrggbb")]
    InvalidColor(String),

    #[error("line {index}: {source}")]
    Line {
        index: usize,
        #[source]
        source: Box<ConfigError>,
    },
}

/// Amplitude taper applied across a line's samples.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    /// `-((2i - n) / n)^2 + 1`: peaks at 1 in the middle, 0 at the left edge.
    #[default]
    Normalized,
    /// `(-(i - n/2)^2 + (n/2)^2) / divisor` with integer halving of `n`.
    Legacy {
        #[serde(default = "default_legacy_divisor")]
        divisor: f32,
    },
}

fn default_legacy_divisor() -> f32 {
    5000.0
}

/// How the color stops are spread over a line's segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientStrategy {
    /// One linear gradient across the full surface width.
    #[default]
    Global,
    /// Equal blocks of samples, each with its own two-stop sub-gradient.
    Segmented,
}

/// Whether a line is traced as a stroke or filled down to the center baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaintStyle {
    #[default]
    Stroke,
    /// The area between the curve and the vertical center of the surface.
    Fill,
}

/// Flat, user-facing parameter set for one line.
///
/// Every field has a default, so a config entry only needs the values it changes.
/// Call [`LineSettings::build`] to validate it into a [`LineConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSettings {
    /// Stroke thickness
    pub line_width: f32,
    /// Samples per line, fixed for the line's lifetime
    pub point_count: usize,
    /// Constant added to the oscillation phase (radians)
    pub phase_offset: f32,
    /// How fast the phase advances with elapsed time (radians per second)
    pub speed: f32,
    /// Base amplitude multiplier
    pub shake_amplitude: f32,
    /// Exponent applied to the volume-derived gain
    pub volume_sensitivity: f32,
    pub color_stops: Vec<ColorStop>,
    pub gradient: GradientStrategy,
    pub envelope: Envelope,
    pub paint_style: PaintStyle,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            line_width: 8.0,
            point_count: 200,
            phase_offset: 5.0,
            speed: 5.0,
            shake_amplitude: 4.0,
            volume_sensitivity: 2.0,
            color_stops: wave_palette(),
            gradient: GradientStrategy::default(),
            envelope: Envelope::default(),
            paint_style: PaintStyle::default(),
        }
    }
}

impl LineSettings {
    /// Validates the settings into an immutable [`LineConfig`].
    ///
    /// # Errors
    /// - If `point_count` is below 2
    /// - If `line_width` is not positive
    /// - If any motion parameter is NaN or infinite
    /// - If the color stops are fewer than 2, out of [0, 1], not strictly
    ///   increasing, or do not start at 0 and end at 1
    pub fn build(self) -> Result<LineConfig, ConfigError> {
        if self.point_count < 2 {
            return Err(ConfigError::TooFewPoints(self.point_count));
        }
        if !(self.line_width.is_finite() && self.line_width > 0.0) {
            return Err(ConfigError::InvalidLineWidth(self.line_width));
        }

        for (name, value) in [
            ("phase_offset", self.phase_offset),
            ("speed", self.speed),
            ("shake_amplitude", self.shake_amplitude),
            ("volume_sensitivity", self.volume_sensitivity),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { name, value });
            }
        }

        if let Envelope::Legacy { divisor } = self.envelope {
            if !(divisor.is_finite() && divisor > 0.0) {
                return Err(ConfigError::InvalidEnvelopeDivisor(divisor));
            }
        }

        validate_color_stops(&self.color_stops)?;

        Ok(LineConfig { settings: self })
    }
}

fn validate_color_stops(stops: &[ColorStop]) -> Result<(), ConfigError> {
    if stops.len() < 2 {
        return Err(ConfigError::TooFewColorStops(stops.len()));
    }

    for (index, stop) in stops.iter().enumerate() {
        if !(0.0..=1.0).contains(&stop.position) {
            return Err(ConfigError::StopOutOfRange {
                index,
                position: stop.position,
            });
        }
        if index > 0 && stop.position <= stops[index - 1].position {
            return Err(ConfigError::StopsNotIncreasing {
                index,
                position: stop.position,
            });
        }
    }

    let first = stops[0].position;
    let last = stops[stops.len() - 1].position;
    if first != 0.0 || last != 1.0 {
        return Err(ConfigError::StopsDoNotSpanLine { first, last });
    }

    Ok(())
}

/// Validated, immutable configuration of one line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineConfig {
    settings: LineSettings,
}

impl Default for LineConfig {
    /// The line drawn when a surface has nothing else to show.
    fn default() -> Self {
        Self {
            settings: LineSettings::default(),
        }
    }
}

impl LineConfig {
    pub fn line_width(&self) -> f32 {
        self.settings.line_width
    }

    pub fn point_count(&self) -> usize {
        self.settings.point_count
    }

    pub fn phase_offset(&self) -> f32 {
        self.settings.phase_offset
    }

    pub fn speed(&self) -> f32 {
        self.settings.speed
    }

    pub fn shake_amplitude(&self) -> f32 {
        self.settings.shake_amplitude
    }

    pub fn volume_sensitivity(&self) -> f32 {
        self.settings.volume_sensitivity
    }

    pub fn color_stops(&self) -> &[ColorStop] {
        &self.settings.color_stops
    }

    pub fn gradient(&self) -> GradientStrategy {
        self.settings.gradient
    }

    pub fn envelope(&self) -> Envelope {
        self.settings.envelope
    }

    pub fn paint_style(&self) -> PaintStyle {
        self.settings.paint_style
    }
}

/// A point on the drawing surface, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A line's configuration plus the points sampled for the current frame.
#[derive(Debug, Clone)]
pub struct WaveLine {
    config: LineConfig,
    points: Vec<Point>,
}

impl WaveLine {
    pub fn new(config: LineConfig) -> Self {
        let points = Vec::with_capacity(config.point_count());
        Self { config, points }
    }

    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    /// Points of the most recent frame (empty before the first one).
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Rebuilds the whole point buffer for one frame.
    pub fn regenerate(&mut self, elapsed_millis: u64, volume: f32, width: f32, height: f32) {
        generator::fill_points(
            &self.config,
            elapsed_millis,
            volume,
            width,
            height,
            &mut self.points,
        );
    }
}
