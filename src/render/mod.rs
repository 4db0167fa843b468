//! Frame-paced rendering onto a host display surface.
//!
//! A [`RenderLoop`] owns one worker thread per available surface. The worker
//! acquires a buffer, lets a [`FrameRenderer`] draw into it and presents it,
//! at most once per frame interval.

pub mod canvas;
pub mod render_loop;
pub mod terminal;

pub use canvas::{Canvas, DisplayList, Segment, SegmentKind, Stroke};
pub use render_loop::{DisplaySurface, FrameRenderer, LoopState, RenderLoop};
pub use terminal::TerminalSurface;

use thiserror::Error;

/// Per-frame failures. The render loop logs these and moves on to the next frame.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("display surface is not available")]
    SurfaceUnavailable,

    #[error("canvas has no drawable area ({width}x{height})")]
    EmptyCanvas { width: f32, height: f32 },

    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to spawn render thread: {0}")]
    Spawn(#[source] std::io::Error),
}
