use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::OutputError;
use crate::Mode;

pub mod console_renderer;
pub mod gpio;

pub use console_renderer::ConsoleRenderer;
pub use gpio::GpioBoard;

/// Chance that a random channel is lit when nothing else is configured.
pub const DEFAULT_RANDOM_PROBABILITY: f64 = 0.5;

/// Where compiled frames end up: relays on real hardware or text on a terminal.
pub trait LightOutput {
    fn channel_count(&self) -> usize;

    /// Show one frame. Random channels are decided at this moment.
    fn apply(&mut self, states: &[Mode]) -> Result<(), OutputError>;

    /// Switch every light off.
    fn all_off(&mut self) -> Result<(), OutputError>;
}

/// Turns channel modes into on/off decisions, remembering the last decision
/// for channels that hold.
pub struct FrameResolver {
    lit: Vec<bool>,
    probability: f64,
    rng: StdRng,
}

impl FrameResolver {
    pub fn new(channel_count: usize, probability: f64) -> Self {
        Self::with_rng(channel_count, probability, StdRng::from_os_rng())
    }

    pub fn seeded(channel_count: usize, probability: f64, seed: u64) -> Self {
        Self::with_rng(channel_count, probability, StdRng::seed_from_u64(seed))
    }

    fn with_rng(channel_count: usize, probability: f64, rng: StdRng) -> Self {
        let probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            DEFAULT_RANDOM_PROBABILITY
        };

        Self {
            lit: vec![false; channel_count],
            probability,
            rng,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.lit.len()
    }

    pub fn resolve(&mut self, states: &[Mode]) -> Result<&[bool], OutputError> {
        if states.len() != self.lit.len() {
            return Err(OutputError::ChannelCount {
                expected: self.lit.len(),
                found: states.len(),
            });
        }

        for (lit, mode) in self.lit.iter_mut().zip(states) {
            match mode {
                Mode::Hold => {}
                Mode::Off => *lit = false,
                Mode::Random => *lit = self.rng.random_bool(self.probability),
                Mode::On => *lit = true,
            }
        }
        Ok(&self.lit)
    }

    pub fn clear(&mut self) -> &[bool] {
        self.lit.fill(false);
        &self.lit
    }
}
