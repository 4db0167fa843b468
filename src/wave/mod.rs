//! Animated waveform lines: configuration, point generation, gradients and
//! the multi-line surface that draws them.

pub mod color;
pub mod generator;
pub mod gradient;
pub mod line;
pub mod surface;
pub mod volume;

pub use color::{ColorStop, Rgb};
pub use line::{
    ConfigError, Envelope, GradientStrategy, LineConfig, LineSettings, PaintStyle, WaveLine,
};
pub use surface::WaveformSurface;
pub use volume::VolumeSignal;
