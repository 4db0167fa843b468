//! Maps a line's color stops onto its segments.

use super::color::{ColorStop, Rgb};
use super::line::{GradientStrategy, LineConfig, Point};

/// Colors at both ends of one segment; a canvas blends between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentPaint {
    pub start: Rgb,
    pub end: Rgb,
}

impl SegmentPaint {
    /// The single color used by canvases that cannot blend along a stroke.
    pub fn midpoint(&self) -> Rgb {
        self.start.lerp(self.end, 0.5)
    }
}

/// Samples a gradient defined by `stops` at relative position `t`.
///
/// Positions outside the first and last stop clamp to the end colors.
pub fn color_at(stops: &[ColorStop], t: f32) -> Rgb {
    let (first, last) = match (stops.first(), stops.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Rgb::BLACK,
    };

    if t.is_nan() || t <= first.position {
        return first.color;
    }
    if t >= last.position {
        return last.color;
    }

    for pair in stops.windows(2) {
        let (from, to) = (&pair[0], &pair[1]);
        if t <= to.position {
            let span = to.position - from.position;
            let local = if span > 0.0 {
                (t - from.position) / span
            } else {
                1.0
            };
            return from.color.lerp(to.color, local);
        }
    }

    last.color
}

/// Per-frame color mapping for one line.
pub struct GradientMapper<'a> {
    stops: &'a [ColorStop],
    strategy: GradientStrategy,
    point_count: usize,
    width: f32,
}

impl<'a> GradientMapper<'a> {
    pub fn new(config: &'a LineConfig, width: f32) -> Self {
        Self {
            stops: config.color_stops(),
            strategy: config.gradient(),
            point_count: config.point_count(),
            width,
        }
    }

    /// Paint for the segment joining `points[index - 1]` and `points[index]`.
    pub fn segment_paint(&self, points: &[Point], index: usize) -> SegmentPaint {
        let from = index.saturating_sub(1);
        match self.strategy {
            GradientStrategy::Global => SegmentPaint {
                start: self.global_color(points[from].x),
                end: self.global_color(points[index].x),
            },
            GradientStrategy::Segmented => SegmentPaint {
                start: self.sample_color(from),
                end: self.sample_color(index),
            },
        }
    }

    fn global_color(&self, x: f32) -> Rgb {
        let t = if self.width > 0.0 { x / self.width } else { 0.0 };
        color_at(self.stops, t)
    }

    /// Which stop pair colors sample `index`, and how far along that pair it sits.
    pub fn stop_index(&self, index: usize) -> (usize, f32) {
        let segments = self.stops.len().saturating_sub(1).max(1);
        let last_sample = self.point_count.saturating_sub(1).max(1);

        let u = index.min(last_sample) as f32 * segments as f32 / last_sample as f32;
        let stop = (u.floor() as usize).min(segments - 1);
        (stop, (u - stop as f32).clamp(0.0, 1.0))
    }

    fn sample_color(&self, index: usize) -> Rgb {
        let (stop, t) = self.stop_index(index);
        let from = self.stops[stop].color;
        let to = self
            .stops
            .get(stop + 1)
            .map_or(from, |next| next.color);
        from.lerp(to, t)
    }
}
