//! Probabilistic sampling of metric emissions.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// Every line is sent when the rate is at or above this value.
pub const FULL_SAMPLE_RATE: f64 = 1.0;

/// Source of uniform draws in `[0, 1)` for sampling decisions.
///
/// Implementations must be safe for concurrent draws from multiple caller
/// threads; they are the only mutable state a client touches after
/// construction.
pub trait SampleSource: Send + Sync {
    fn draw(&self) -> f64;
}

/// Production source backed by the per-thread generator, so concurrent
/// draws never contend.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRngSource;

impl SampleSource for ThreadRngSource {
    fn draw(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Replays a fixed sequence of draws, repeating the last value once the
/// sequence is exhausted. Deterministic stand-in for tests.
#[derive(Debug)]
pub struct SequenceSource {
    draws: Vec<f64>,
    next: AtomicUsize,
}

impl SequenceSource {
    /// `draws` must not be empty.
    pub fn new(draws: Vec<f64>) -> Self {
        assert!(!draws.is_empty(), "SequenceSource needs at least one draw");
        Self {
            draws,
            next: AtomicUsize::new(0),
        }
    }
}

impl SampleSource for SequenceSource {
    fn draw(&self) -> f64 {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        self.draws[index.min(self.draws.len() - 1)]
    }
}

/// Sampling decision for one line. Rates at or above
/// [FULL_SAMPLE_RATE] short-circuit without consuming a draw; below it the
/// line is sent only when the draw lands at or under the rate, so a rate
/// of zero never sends.
pub(crate) fn should_send(sample_rate: f64, source: &dyn SampleSource) -> bool {
    sample_rate >= FULL_SAMPLE_RATE || source.draw() <= sample_rate
}
