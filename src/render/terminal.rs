//! Terminal display surface backed by ratatui's braille canvas.
//!
//! Each terminal cell holds a 2x4 braille dot matrix, so a surface of
//! `cols x rows` cells draws at a logical resolution of `cols * 2` by `rows * 4`.

use std::io::{self, Stdout};

use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    style::Color,
    symbols::Marker,
    widgets::canvas::{Canvas as CanvasWidget, Context, Line},
    Terminal,
};

use super::canvas::{Canvas, DisplayList, Segment, SegmentKind};
use super::render_loop::DisplaySurface;
use super::RenderError;

const DOTS_PER_COLUMN: u32 = 2;
const DOTS_PER_ROW: u32 = 4;

/// A [`DisplaySurface`] that rasterizes display lists into a ratatui terminal.
pub struct TerminalSurface<B: Backend> {
    terminal: Terminal<B>,
    cols: u32,
    rows: u32,
    released: bool,
}

impl<B: Backend> TerminalSurface<B> {
    /// Wraps a backend, sized to its current dimensions.
    ///
    /// # Errors
    /// - If the terminal cannot be created or its size cannot be read
    pub fn new(backend: B) -> io::Result<Self> {
        let terminal = Terminal::new(backend)?;
        let size = terminal.size()?;
        Ok(Self {
            terminal,
            cols: u32::from(size.width),
            rows: u32::from(size.height),
            released: false,
        })
    }

    /// Current size in cells.
    pub fn cells(&self) -> (u32, u32) {
        (self.cols, self.rows)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }
}

impl TerminalSurface<CrosstermBackend<Stdout>> {
    /// Enters raw mode and the alternate screen on stdout.
    ///
    /// # Errors
    /// - If raw mode cannot be enabled
    /// - If alternate screen cannot be entered
    /// - If the terminal cannot be initialized
    pub fn enter() -> anyhow::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

        let surface = Self::new(CrosstermBackend::new(stdout))?;
        tracing::debug!("Terminal surface entered ({}x{} cells)", surface.cols, surface.rows);
        Ok(surface)
    }

    /// Leaves the alternate screen and disables raw mode.
    ///
    /// # Errors
    /// - If terminal mode cannot be disabled
    /// - If cursor cannot be shown
    pub fn restore(&mut self) -> anyhow::Result<()> {
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl<B: Backend + Send + 'static> DisplaySurface for TerminalSurface<B> {
    type Buffer = DisplayList;

    fn acquire_buffer(&mut self) -> Result<DisplayList, RenderError> {
        if self.released {
            return Err(RenderError::SurfaceUnavailable);
        }
        Ok(DisplayList::new(
            (self.cols * DOTS_PER_COLUMN) as f32,
            (self.rows * DOTS_PER_ROW) as f32,
        ))
    }

    fn present_buffer(&mut self, buffer: DisplayList) -> Result<(), RenderError> {
        if self.released {
            return Err(RenderError::SurfaceUnavailable);
        }

        let (width, height) = canvas_size(&buffer);
        let background = buffer.background().map_or(Color::Reset, Color::from);

        self.terminal.draw(|frame| {
            let widget = CanvasWidget::default()
                .marker(Marker::Braille)
                .background_color(background)
                .x_bounds([0.0, width])
                .y_bounds([0.0, height])
                .paint(|ctx| {
                    for segment in buffer.segments() {
                        draw_segment(ctx, segment, (width, height));
                    }
                });
            frame.render_widget(widget, frame.area());
        })?;
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.cols = width;
        self.rows = height;
    }

    fn release(&mut self) {
        self.released = true;
        tracing::debug!("Terminal surface released");
    }
}

fn canvas_size(buffer: &DisplayList) -> (f64, f64) {
    let (width, height) = buffer.size();
    (f64::from(width), f64::from(height))
}

/// Number of one-dot strokes used to approximate a line of `width`.
fn stroke_passes(width: f32) -> usize {
    ((width / 2.0).round() as usize).max(1)
}

fn draw_segment(ctx: &mut Context<'_>, segment: &Segment, (width, height): (f64, f64)) {
    let color = Color::from(segment.paint.midpoint());
    // canvas origin is bottom-left
    let (x0, y0) = (f64::from(segment.from.x), height - f64::from(segment.from.y));
    let (x1, y1) = (f64::from(segment.to.x), height - f64::from(segment.to.y));
    let mut draw_clipped = |from: (f64, f64), to: (f64, f64)| {
        if let Some(((x0, y0), (x1, y1))) = clip_segment(from, to, width, height) {
            ctx.draw(&Line::new(x0, y0, x1, y1, color));
        }
    };

    match segment.kind {
        SegmentKind::Stroke { width: stroke_width } => {
            let passes = stroke_passes(stroke_width);
            let center = (passes - 1) as f64 / 2.0;
            for pass in 0..passes {
                let offset = pass as f64 - center;
                draw_clipped((x0, y0 + offset), (x1, y1 + offset));
            }
        }
        SegmentKind::Fill { baseline } => {
            let baseline = height - f64::from(baseline);
            let ((left, y_left), (right, y_right)) = if x0 <= x1 {
                ((x0, y0), (x1, y1))
            } else {
                ((x1, y1), (x0, y0))
            };
            // one vertical run per dot column inside the segment
            let mut x = left.ceil();
            while x <= right {
                let t = if right > left { (x - left) / (right - left) } else { 0.0 };
                let y = y_left + (y_right - y_left) * t;
                draw_clipped((x, y), (x, baseline));
                x += 1.0;
            }
        }
    }
}

/// Clips a segment to `[0, width] x [0, height]` (Liang-Barsky).
///
/// Returns `None` when no part of the segment is inside.
fn clip_segment(
    (x0, y0): (f64, f64),
    (x1, y1): (f64, f64),
    width: f64,
    height: f64,
) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (x1 - x0, y1 - y0);
    let (mut enter, mut exit) = (0.0_f64, 1.0_f64);

    for (p, q) in [(-dx, x0), (dx, width - x0), (-dy, y0), (dy, height - y0)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            enter = enter.max(t);
        } else {
            exit = exit.min(t);
        }
        if enter > exit {
            return None;
        }
    }

    // rounding must not push an endpoint back outside the bounds
    let at = |t: f64| {
        (
            (x0 + dx * t).clamp(0.0, width),
            (y0 + dy * t).clamp(0.0, height),
        )
    };
    Some((at(enter), at(exit)))
}
