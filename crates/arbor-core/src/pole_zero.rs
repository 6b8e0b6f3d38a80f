//! General first-order pole-zero section.
//!
//! ```text
//! y[n] = gain * (b0 * x[n] + b1 * x[n-1]) - a1 * y[n-1]
//! ```
//!
//! Configured with [`PoleZero::set_block_zero`] it becomes the classic DC
//! blocker `H(z) = (1 - z^-1) / (1 - R z^-1)`, whose -3 dB cutoff is roughly
//! `(1 - R) / (2π) * fs`.
//!
//! Reference: Julius O. Smith, "Introduction to Digital Filters with Audio
//! Applications", DC Blocker.

use crate::{Filter, flush_denormal};

/// First-order IIR section with one pole and one zero.
///
/// ## Example
///
/// ```rust
/// use arbor_core::{Filter, PoleZero};
///
/// let mut blocker = PoleZero::dc_blocker(0.995);
/// let mut out = 0.0;
/// for _ in 0..48000 {
///     out = blocker.tick(1.0);
/// }
/// assert!(out.abs() < 0.01);
/// ```
#[derive(Debug, Clone)]
pub struct PoleZero {
    b0: f32,
    b1: f32,
    a1: f32,
    gain: f32,
    x_prev: f32,
    y_prev: f32,
}

impl PoleZero {
    /// Passthrough section (`b0 = 1`, everything else zero).
    pub fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            a1: 0.0,
            gain: 1.0,
            x_prev: 0.0,
            y_prev: 0.0,
        }
    }

    /// DC blocker with the given pole radius.
    pub fn dc_blocker(pole: f32) -> Self {
        let mut section = Self::new();
        section.set_block_zero(pole);
        section
    }

    /// Set all three coefficients.
    pub fn set_coefficients(&mut self, b0: f32, b1: f32, a1: f32) {
        self.b0 = b0;
        self.b1 = b1;
        self.a1 = a1;
    }

    /// Feedforward coefficient on the current input.
    pub fn set_b0(&mut self, b0: f32) {
        self.b0 = b0;
    }

    /// Feedforward coefficient on the previous input.
    pub fn set_b1(&mut self, b1: f32) {
        self.b1 = b1;
    }

    /// Feedback coefficient. Clamped to `(-1, 1)` to keep the pole stable.
    pub fn set_a1(&mut self, a1: f32) {
        self.a1 = a1.clamp(-0.99999, 0.99999);
    }

    /// Put the zero at DC and the pole at `pole` (DC blocker).
    pub fn set_block_zero(&mut self, pole: f32) {
        let pole = pole.clamp(0.0, 0.99999);
        self.b0 = 1.0;
        self.b1 = -1.0;
        self.a1 = -pole;
    }

    /// Output gain (applied to the feedforward path).
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    /// Current `(b0, b1, a1)`.
    pub fn coefficients(&self) -> (f32, f32, f32) {
        (self.b0, self.b1, self.a1)
    }
}

impl Default for PoleZero {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for PoleZero {
    #[inline]
    fn tick(&mut self, input: f32) -> f32 {
        let x = input * self.gain;
        let y = flush_denormal(self.b0 * x + self.b1 * self.x_prev - self.a1 * self.y_prev);
        self.x_prev = x;
        self.y_prev = y;
        y
    }

    fn reset(&mut self) {
        self.x_prev = 0.0;
        self.y_prev = 0.0;
    }
}
