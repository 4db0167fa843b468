//! Drawing target abstraction and the recorded frame buffer.

use crate::wave::color::Rgb;
use crate::wave::gradient::SegmentPaint;
use crate::wave::line::Point;

/// How a segment is stroked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub width: f32,
    pub paint: SegmentPaint,
}

/// A drawable buffer for one frame. Coordinates have y growing downwards.
pub trait Canvas {
    /// Drawable width and height in canvas units.
    fn size(&self) -> (f32, f32);

    /// Clears the whole canvas to `color`.
    fn fill(&mut self, color: Rgb);

    /// Strokes a straight segment between two points.
    fn stroke_segment(&mut self, from: Point, to: Point, stroke: &Stroke);

    /// Fills the area between a straight segment and the horizontal line
    /// `y = baseline`.
    fn fill_span(&mut self, from: Point, to: Point, baseline: f32, paint: SegmentPaint);
}

/// How a recorded segment is painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentKind {
    Stroke { width: f32 },
    Fill { baseline: f32 },
}

/// One recorded segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
    pub paint: SegmentPaint,
    pub kind: SegmentKind,
}

impl Segment {
    /// Stroke width, or `None` for a filled span.
    pub fn stroke_width(&self) -> Option<f32> {
        match self.kind {
            SegmentKind::Stroke { width } => Some(width),
            SegmentKind::Fill { .. } => None,
        }
    }
}

/// A frame recorded as a background plus an ordered list of segments.
///
/// Surfaces hand these out from `acquire_buffer` and rasterize them on present.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayList {
    width: f32,
    height: f32,
    background: Option<Rgb>,
    segments: Vec<Segment>,
}

impl DisplayList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            background: None,
            segments: Vec::new(),
        }
    }

    pub fn background(&self) -> Option<Rgb> {
        self.background
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl Canvas for DisplayList {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn fill(&mut self, color: Rgb) {
        self.background = Some(color);
        self.segments.clear();
    }

    fn stroke_segment(&mut self, from: Point, to: Point, stroke: &Stroke) {
        self.record(Segment {
            from,
            to,
            paint: stroke.paint,
            kind: SegmentKind::Stroke {
                width: stroke.width,
            },
        });
    }

    fn fill_span(&mut self, from: Point, to: Point, baseline: f32, paint: SegmentPaint) {
        self.record(Segment {
            from,
            to,
            paint,
            kind: SegmentKind::Fill { baseline },
        });
    }
}

impl DisplayList {
    fn record(&mut self, segment: Segment) {
        let Segment { from, to, kind, .. } = segment;
        let extra = match kind {
            SegmentKind::Stroke { width } => width,
            SegmentKind::Fill { baseline } => baseline,
        };
        let finite = [from.x, from.y, to.x, to.y, extra]
            .iter()
            .all(|v| v.is_finite());
        if finite {
            self.segments.push(segment);
        }
    }
}
