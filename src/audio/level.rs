//! Conversion from raw PCM blocks to a volume value.

/// Width of the meter window below the reference level, in dB.
pub const METER_RANGE_DB: f32 = 40.0;

/// dBFS reported for digital silence.
const SILENCE_DBFS: f32 = -160.0;

/// RMS level of a block of i16 samples in dBFS.
pub fn rms_dbfs(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return SILENCE_DBFS;
    }

    let sum_of_squares: i64 = samples.iter().map(|&x| (x as i64).pow(2)).sum();
    let mean_square = sum_of_squares / samples.len() as i64;
    let rms = (mean_square as f32).sqrt();

    if rms > 0.0 {
        20.0 * (rms / i16::MAX as f32).log10()
    } else {
        SILENCE_DBFS
    }
}

/// Maps dBFS onto 0..=1 across the window ending at `reference_level_db`.
pub fn meter_level(db_fs: f32, reference_level_db: i8) -> f32 {
    let min_db = reference_level_db as f32 - METER_RANGE_DB;
    ((db_fs - min_db) / METER_RANGE_DB).clamp(0.0, 1.0)
}

/// Volume written to the lines for one block of samples.
pub fn block_volume(samples: &[i16], reference_level_db: i8, max_volume: f32) -> f32 {
    meter_level(rms_dbfs(samples), reference_level_db) * max_volume
}
