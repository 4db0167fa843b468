//! Animated waveform in the terminal.
//!
//! Loads the configured lines, starts the volume source and drives the render
//! loop until the user quits or the process receives SIGINT/SIGTERM.

use anyhow::anyhow;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::backend::CrosstermBackend;
use std::io::Stdout;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use crate::audio::MicrophoneVolume;
use crate::config::LinewaveConfig;
use crate::render::{RenderLoop, TerminalSurface};
use crate::wave::{VolumeSignal, WaveformSurface};

type TerminalLoop = RenderLoop<TerminalSurface<CrosstermBackend<Stdout>>, WaveformSurface>;

/// How long the host waits for a terminal event before re-checking signals.
const EVENT_POLL: Duration = Duration::from_millis(50);

/// Volume change per Up/Down key press.
const VOLUME_STEP: f32 = 1.0;

/// Options of the `run` command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Fixed volume; disables the microphone
    pub volume: Option<f32>,
    /// Skip the microphone and start at volume 0
    pub no_mic: bool,
    /// Overrides `audio.device` from the config file
    pub device: Option<String>,
}

impl RunOptions {
    fn uses_microphone(&self) -> bool {
        self.volume.is_none() && !self.no_mic
    }
}

/// What the host does in response to a terminal event.
#[derive(Debug, Clone, Copy, PartialEq)]
enum HostCommand {
    Continue,
    Quit,
    Resize(u16, u16),
    Nudge(f32),
}

/// Runs the waveform animation until quit.
///
/// # Errors
/// - If the config cannot be loaded or a line is invalid
/// - If the microphone cannot be opened
/// - If the terminal cannot be set up or the render thread cannot start
pub fn handle_run(options: RunOptions) -> anyhow::Result<()> {
    tracing::info!("=== linewave started ===");

    let config = LinewaveConfig::load()?;
    let lines = config
        .line_configs()
        .map_err(|e| anyhow!("Invalid line configuration: {e}"))?;

    let mut waveform = WaveformSurface::new(config.surface.background);
    for line in lines {
        waveform.add_line(line);
    }
    let volume = waveform.volume_signal();

    let mut audio = config.audio.clone();
    if let Some(device) = options.device.clone() {
        audio.device = device;
    }

    let _microphone = if options.uses_microphone() {
        let microphone = MicrophoneVolume::start(&audio, volume.clone()).map_err(|e| {
            anyhow!("{e}\n\nRun with --no-mic or --volume to animate without a microphone.")
        })?;
        tracing::info!("Listening on '{}'", microphone.device_name());
        Some(microphone)
    } else {
        let initial = options.volume.unwrap_or(0.0);
        volume.set(initial);
        tracing::info!("Microphone disabled, volume fixed at {}", initial);
        None
    };

    let terminate = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&terminate))
            .map_err(|e| anyhow!("Failed to register signal handler: {e}"))?;
    }

    let surface = TerminalSurface::enter()?;
    let (cols, rows) = surface.cells();
    let mut render_loop = RenderLoop::new(surface, waveform, config.surface.frame_interval());

    let result = drive(
        &mut render_loop,
        (cols, rows),
        &volume,
        !options.uses_microphone(),
        &terminate,
    );

    render_loop.shutdown();
    let restored = render_loop
        .surface()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .restore();

    tracing::info!(
        "=== linewave stopped: {} frames presented, {} dropped ===",
        render_loop.frames_presented(),
        render_loop.frames_dropped()
    );

    result.and(restored)
}

/// Starts the render loop and forwards terminal events until quit.
fn drive(
    render_loop: &mut TerminalLoop,
    (cols, rows): (u32, u32),
    volume: &VolumeSignal,
    manual_volume: bool,
    terminate: &AtomicBool,
) -> anyhow::Result<()> {
    render_loop.on_available(cols, rows)?;

    while !terminate.load(Ordering::Relaxed) {
        if !event::poll(EVENT_POLL)? {
            continue;
        }

        match host_command(event::read()?, manual_volume) {
            HostCommand::Continue => {}
            HostCommand::Quit => break,
            HostCommand::Resize(cols, rows) => {
                render_loop.on_resized(u32::from(cols), u32::from(rows));
            }
            HostCommand::Nudge(delta) => {
                let level = volume.nudge(delta);
                tracing::debug!("Volume set to {}", level);
            }
        }
    }

    if terminate.load(Ordering::Relaxed) {
        tracing::info!("Received termination signal");
    }
    Ok(())
}

fn host_command(event: Event, manual_volume: bool) -> HostCommand {
    match event {
        Event::Resize(cols, rows) => HostCommand::Resize(cols, rows),
        Event::Key(key) if key.kind == KeyEventKind::Press => key_command(key, manual_volume),
        _ => HostCommand::Continue,
    }
}

fn key_command(key: KeyEvent, manual_volume: bool) -> HostCommand {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            tracing::debug!("Escape or 'q' pressed: quitting");
            HostCommand::Quit
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            tracing::debug!("Ctrl+C pressed: quitting");
            HostCommand::Quit
        }
        KeyCode::Up if manual_volume => HostCommand::Nudge(VOLUME_STEP),
        KeyCode::Down if manual_volume => HostCommand::Nudge(-VOLUME_STEP),
        _ => HostCommand::Continue,
    }
}
