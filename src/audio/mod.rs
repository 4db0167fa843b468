//! Microphone-driven volume source.
//!
//! Captures the configured input device and turns every block of samples into
//! a volume value for the waveform lines.

pub mod device;
pub mod level;

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::config::AudioConfig;
use crate::wave::VolumeSignal;

pub use device::{find_input_device, suppress_alsa_warnings};

/// Keeps an input stream alive that writes its level into a [`VolumeSignal`].
///
/// Dropping the value stops the stream.
pub struct MicrophoneVolume {
    _stream: cpal::Stream,
    device_name: String,
}

impl MicrophoneVolume {
    /// Opens the configured device and starts feeding `signal`.
    ///
    /// # Errors
    /// - If the specified device is not available
    /// - If device configuration fails
    /// - If audio stream creation fails
    pub fn start(config: &AudioConfig, signal: VolumeSignal) -> Result<Self> {
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();
            find_input_device(&host, &config.device)
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Volume input device: {}", device_name);

        let device_config = device.default_input_config()?;
        tracing::debug!(
            "Device configuration: {}Hz, {} channels",
            device_config.sample_rate().0,
            device_config.channels()
        );

        let reference_level_db = config.reference_level_db;
        let max_volume = config.max_volume;

        let stream = device.build_input_stream(
            &device_config.into(),
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                signal.set(level::block_volume(data, reference_level_db, max_volume));
            },
            |err| {
                tracing::error!("Audio stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;
        tracing::debug!("Audio stream started");

        Ok(Self {
            _stream: stream,
            device_name,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}
