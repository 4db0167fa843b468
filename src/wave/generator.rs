//! Point generation for a single waveform line.
//!
//! Every frame is an independent evaluation of the line's closed-form shape:
//! the same config, time, volume and surface size always produce the same points.

use super::line::{Envelope, LineConfig, Point};

/// Amplitude taper for sample `index` of `point_count`.
pub fn envelope(kind: Envelope, index: usize, point_count: usize) -> f32 {
    match kind {
        Envelope::Normalized => {
            let n = point_count as f32;
            let d = (2.0 * index as f32 - n) / n;
            -(d * d) + 1.0
        }
        Envelope::Legacy { divisor } => {
            let half = (point_count / 2) as f32;
            let d = index as f32 - half;
            (-(d * d) + half * half) / divisor
        }
    }
}

/// Gain applied by the current volume: `(volume / 10 + 1) ^ sensitivity`.
///
/// Volumes below -10 make the base negative: integer sensitivities flip the
/// wave's phase, fractional ones yield NaN.
pub fn volume_factor(volume: f32, sensitivity: f32) -> f32 {
    (volume / 10.0 + 1.0).powf(sensitivity)
}

/// Phase advance after `elapsed_millis` at `speed` radians per second.
pub fn time_offset(elapsed_millis: u64, speed: f32) -> f32 {
    elapsed_millis as f32 / 1000.0 * speed
}

/// Samples a full line for one frame.
pub fn generate_points(
    config: &LineConfig,
    elapsed_millis: u64,
    volume: f32,
    width: f32,
    height: f32,
) -> Vec<Point> {
    let mut points = Vec::with_capacity(config.point_count());
    fill_points(config, elapsed_millis, volume, width, height, &mut points);
    points
}

/// Like [`generate_points`], but reuses `points` (cleared first).
pub fn fill_points(
    config: &LineConfig,
    elapsed_millis: u64,
    volume: f32,
    width: f32,
    height: f32,
    points: &mut Vec<Point>,
) {
    points.clear();

    let point_count = config.point_count();
    let spacing = width / (point_count - 1) as f32;
    let center = height / 2.0;

    let phase = time_offset(elapsed_millis, config.speed()) + config.phase_offset();
    let gain = config.shake_amplitude() * volume_factor(volume, config.volume_sensitivity());

    for i in 0..point_count {
        let x = if i == point_count - 1 {
            width
        } else {
            i as f32 * spacing
        };
        let taper = envelope(config.envelope(), i, point_count);
        let dy = (x.to_radians() + phase).sin() * taper * gain;
        points.push(Point::new(x, center - dy));
    }
}
