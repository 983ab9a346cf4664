//! Latest CPU reading shared between the sampler, render and status loops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A CPU percentage in `[0, 100]` that one task writes and any number of tasks read.
///
/// Stored as the bit pattern of an `f64` in an atomic, so reads never block and
/// never tear. There is no history: every store replaces the previous value.
#[derive(Clone, Debug, Default)]
pub struct SharedSample(Arc<AtomicU64>);

impl SharedSample {
    /// Starts at 0%, which selects the idle animation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new reading. NaN is dropped; anything else is clamped to `[0, 100]`.
    pub fn store(&self, percent: f64) {
        if percent.is_nan() {
            return;
        }
        let clamped = percent.clamp(0.0, 100.0);
        self.0.store(clamped.to_bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}
