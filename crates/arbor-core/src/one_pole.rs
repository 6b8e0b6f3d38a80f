//! One-pole lowpass filter.
//!
//! ```text
//! y[n] = (1 - pole) * x[n] + pole * y[n-1]
//! ```
//!
//! with `pole = exp(-2π * freq / sample_rate)`. 6 dB/octave, zero latency.
//!
//! # Usage
//!
//! ```rust
//! use arbor_core::{Filter, OnePole};
//!
//! let mut lp = OnePole::new(48000.0, 4000.0);
//! let filtered = lp.tick(1.0);
//! assert!(filtered < 1.0);
//! ```

use crate::{Filter, flush_denormal};
use libm::expf;

/// One-pole (6 dB/oct) lowpass filter.
///
/// # Invariants
///
/// - `pole` is always in [0, 1) for stable operation
/// - `state` is flushed to zero when below 1e-20
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    pole: f32,
    gain: f32,
    sample_rate: f32,
    freq: f32,
}

impl OnePole {
    /// Create a one-pole lowpass with the given cutoff.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            pole: 0.0,
            gain: 1.0,
            sample_rate,
            freq: 0.0,
        };
        filter.set_freq(freq_hz);
        filter
    }

    /// Set the cutoff frequency. Clamped to `[0, sample_rate / 2]`.
    pub fn set_freq(&mut self, freq_hz: f32) {
        self.freq = freq_hz.clamp(0.0, self.sample_rate * 0.5);
        self.pole = expf(-core::f32::consts::TAU * self.freq / self.sample_rate);
    }

    /// Set the pole position directly. Clamped to `[0, 0.9999]`.
    pub fn set_pole(&mut self, pole: f32) {
        self.pole = pole.clamp(0.0, 0.9999);
    }

    /// Output gain applied after filtering.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    /// Current pole position.
    pub fn pole(&self) -> f32 {
        self.pole
    }

    /// Update sample rate and recompute the pole from the stored cutoff.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        let freq = self.freq;
        self.set_freq(freq);
    }
}

impl Filter for OnePole {
    #[inline]
    fn tick(&mut self, input: f32) -> f32 {
        self.state = flush_denormal(input + self.pole * (self.state - input));
        self.state * self.gain
    }

    fn reset(&mut self) {
        self.state = 0.0;
    }
}
