//! Latest-value volume cell shared between the volume source and the render thread.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Most recently observed volume.
///
/// Cloning yields another handle to the same cell. Writers overwrite, readers
/// never block; a read may miss a write made during the same frame.
#[derive(Debug, Clone, Default)]
pub struct VolumeSignal {
    bits: Arc<AtomicU32>,
}

impl VolumeSignal {
    pub fn new(initial: f32) -> Self {
        Self {
            bits: Arc::new(AtomicU32::new(initial.to_bits())),
        }
    }

    pub fn set(&self, volume: f32) {
        self.bits.store(volume.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Adds `delta` to the current value and returns the new volume.
    pub fn nudge(&self, delta: f32) -> f32 {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(current) + delta).to_bits();
            match self.bits.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return f32::from_bits(next),
                Err(actual) => current = actual,
            }
        }
    }
}
