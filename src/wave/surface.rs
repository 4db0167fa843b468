//! Multi-line waveform renderer.

use crate::render::canvas::{Canvas, Stroke};
use crate::render::render_loop::FrameRenderer;
use crate::render::RenderError;

use super::color::Rgb;
use super::gradient::GradientMapper;
use super::line::{LineConfig, PaintStyle, WaveLine};
use super::volume::VolumeSignal;

/// Draws an ordered stack of wave lines over a solid background.
///
/// Lines are drawn in insertion order, so later lines end up on top. A surface
/// with no lines adds a [`LineConfig::default`] line on its first frame.
/// Filled lines cover the area between the curve and `y = height / 2`.
#[derive(Debug)]
pub struct WaveformSurface {
    lines: Vec<WaveLine>,
    volume: VolumeSignal,
    background: Rgb,
}

impl Default for WaveformSurface {
    fn default() -> Self {
        Self::new(Rgb::WHITE)
    }
}

impl WaveformSurface {
    pub fn new(background: Rgb) -> Self {
        Self {
            lines: Vec::new(),
            volume: VolumeSignal::default(),
            background,
        }
    }

    /// Appends a line on top of the existing ones.
    pub fn add_line(&mut self, config: LineConfig) {
        self.lines.push(WaveLine::new(config));
    }

    /// Overwrites the current volume; picked up by the next frame.
    pub fn set_volume(&self, volume: f32) {
        self.volume.set(volume);
    }

    /// Handle a volume source can write to from another thread.
    pub fn volume_signal(&self) -> VolumeSignal {
        self.volume.clone()
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn lines(&self) -> &[WaveLine] {
        &self.lines
    }
}

impl FrameRenderer for WaveformSurface {
    fn draw_frame(
        &mut self,
        canvas: &mut dyn Canvas,
        elapsed_millis: u64,
    ) -> Result<(), RenderError> {
        let (width, height) = canvas.size();
        if !(width > 0.0 && height > 0.0) {
            return Err(RenderError::EmptyCanvas { width, height });
        }

        canvas.fill(self.background);

        if self.lines.is_empty() {
            tracing::info!("No lines configured, drawing the default line");
            self.add_line(LineConfig::default());
        }

        let volume = self.volume.get();
        let baseline = height / 2.0;
        for line in &mut self.lines {
            line.regenerate(elapsed_millis, volume, width, height);

            let config = line.config();
            let mapper = GradientMapper::new(config, width);
            let points = line.points();
            for index in 1..points.len() {
                let (from, to) = (points[index - 1], points[index]);
                let paint = mapper.segment_paint(points, index);
                match config.paint_style() {
                    PaintStyle::Stroke => {
                        let stroke = Stroke {
                            width: config.line_width(),
                            paint,
                        };
                        canvas.stroke_segment(from, to, &stroke);
                    }
                    PaintStyle::Fill => canvas.fill_span(from, to, baseline, paint),
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::{DisplayList, SegmentKind};
    use crate::wave::generator::generate_points;
    use crate::wave::line::LineSettings;

    fn line(line_width: f32, point_count: usize) -> LineConfig {
        LineSettings {
            line_width,
            point_count,
            ..Default::default()
        }
        .build()
        .unwrap()
    }

    fn draw(surface: &mut WaveformSurface, elapsed_millis: u64) -> DisplayList {
        let mut canvas = DisplayList::new(320.0, 120.0);
        surface.draw_frame(&mut canvas, elapsed_millis).unwrap();
        canvas
    }

    #[test]
    fn test_empty_surface_draws_one_default_line() {
        let mut surface = WaveformSurface::default();
        let frame = draw(&mut surface, 0);

        assert_eq!(frame.background(), Some(Rgb::WHITE));
        assert_eq!(surface.lines().len(), 1);
        assert_eq!(surface.lines()[0].config(), &LineConfig::default());

        let default = LineConfig::default();
        assert_eq!(frame.segments().len(), default.point_count() - 1);
        assert!(frame
            .segments()
            .iter()
            .all(|s| s.stroke_width() == Some(default.line_width())));

        // the default line persists
        draw(&mut surface, 15);
        assert_eq!(surface.lines().len(), 1);
    }

    #[test]
    fn test_lines_are_drawn_in_insertion_order() {
        let mut surface = WaveformSurface::new(Rgb::BLACK);
        surface.add_line(line(3.0, 10));
        surface.add_line(line(6.0, 20));
        surface.add_line(line(1.0, 5));

        let frame = draw(&mut surface, 500);
        let widths: Vec<f32> = frame
            .segments()
            .iter()
            .filter_map(|s| s.stroke_width())
            .collect();

        let mut expected = vec![3.0; 9];
        expected.extend(vec![6.0; 19]);
        expected.extend(vec![1.0; 4]);
        assert_eq!(widths, expected);
        assert_eq!(frame.background(), Some(Rgb::BLACK));
    }

    #[test]
    fn test_segments_follow_the_generated_points() {
        let mut surface = WaveformSurface::default();
        surface.add_line(line(4.0, 50));
        surface.set_volume(12.0);

        let frame = draw(&mut surface, 750);
        let points = generate_points(&line(4.0, 50), 750, 12.0, 320.0, 120.0);
        for (index, segment) in frame.segments().iter().enumerate() {
            assert_eq!(segment.from, points[index]);
            assert_eq!(segment.to, points[index + 1]);
        }
    }

    #[test]
    fn test_filled_lines_record_spans_to_the_center() {
        let mut surface = WaveformSurface::default();
        surface.add_line(line(2.0, 10));
        surface.add_line(
            LineSettings {
                point_count: 10,
                paint_style: PaintStyle::Fill,
                ..Default::default()
            }
            .build()
            .unwrap(),
        );

        let frame = draw(&mut surface, 250);
        let (strokes, fills) = frame.segments().split_at(9);
        assert!(strokes.iter().all(|s| s.kind == SegmentKind::Stroke { width: 2.0 }));
        assert_eq!(fills.len(), 9);
        assert!(fills.iter().all(|s| s.kind == SegmentKind::Fill { baseline: 60.0 }));
        assert_eq!(fills[0].from, surface.lines()[1].points()[0]);
    }

    #[test]
    fn test_volume_signal_reaches_the_next_frame() {
        let mut surface = WaveformSurface::default();
        surface.add_line(line(2.0, 40));
        let quiet = draw(&mut surface, 100);

        surface.volume_signal().set(30.0);
        let loud = draw(&mut surface, 100);

        let spread = |frame: &DisplayList| {
            frame
                .segments()
                .iter()
                .map(|s| (s.from.y - 60.0).abs())
                .fold(0.0_f32, f32::max)
        };
        assert!(spread(&loud) > spread(&quiet));
    }

    #[test]
    fn test_empty_canvas_is_rejected_without_side_effects() {
        let mut surface = WaveformSurface::default();
        let mut canvas = DisplayList::new(0.0, 100.0);
        assert!(matches!(
            surface.draw_frame(&mut canvas, 0),
            Err(RenderError::EmptyCanvas { .. })
        ));
        assert!(surface.lines().is_empty());
        assert!(canvas.background().is_none());
    }
}
