//! Biquad (bi-quadratic) filter and Butterworth cascades.
//!
//! [`Biquad`] is a Direct Form I second-order section. Coefficients come from
//! the RBJ Audio EQ Cookbook helpers below. [`Butterworth`] cascades up to
//! four sections for maximally flat lowpass/highpass responses of order
//! 2, 4, 6 or 8.

use core::f32::consts::PI;
use libm::{cosf, sinf};

use crate::{Filter, flush_denormal};

/// Normalized-or-not RBJ coefficient set `(b0, b1, b2, a0, a1, a2)`.
pub type Coefficients = (f32, f32, f32, f32, f32, f32);

/// Second-order IIR section.
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
///                - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Biquad with passthrough coefficients.
    pub const fn new() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Biquad initialised from an RBJ coefficient tuple.
    pub fn from_coefficients(coeffs: Coefficients) -> Self {
        let mut biquad = Self::new();
        biquad.set_coefficients(coeffs);
        biquad
    }

    /// Set coefficients, normalising by `a0`.
    pub fn set_coefficients(&mut self, (b0, b1, b2, a0, a1, a2): Coefficients) {
        let a0_inv = 1.0 / a0;
        self.b0 = b0 * a0_inv;
        self.b1 = b1 * a0_inv;
        self.b2 = b2 * a0_inv;
        self.a1 = a1 * a0_inv;
        self.a2 = a2 * a0_inv;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for Biquad {
    #[inline]
    fn tick(&mut self, input: f32) -> f32 {
        let output = flush_denormal(
            self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
                - self.a1 * self.y1
                - self.a2 * self.y2,
        );

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

#[inline]
fn omega_terms(frequency: f32, q: f32, sample_rate: f32) -> (f32, f32) {
    let omega = 2.0 * PI * frequency / sample_rate;
    (cosf(omega), sinf(omega) / (2.0 * q))
}

/// RBJ lowpass coefficients. `q = 0.707` gives a Butterworth response.
pub fn lowpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);
    let b1 = 1.0 - cos_omega;
    (
        b1 / 2.0,
        b1,
        b1 / 2.0,
        1.0 + alpha,
        -2.0 * cos_omega,
        1.0 - alpha,
    )
}

/// RBJ highpass coefficients.
pub fn highpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);
    let b0 = (1.0 + cos_omega) / 2.0;
    (
        b0,
        -(1.0 + cos_omega),
        b0,
        1.0 + alpha,
        -2.0 * cos_omega,
        1.0 - alpha,
    )
}

/// RBJ bandpass coefficients (constant 0 dB peak gain).
pub fn bandpass_coefficients(frequency: f32, q: f32, sample_rate: f32) -> Coefficients {
    let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);
    (
        alpha,
        0.0,
        -alpha,
        1.0 + alpha,
        -2.0 * cos_omega,
        1.0 - alpha,
    )
}

/// Response of a [`Butterworth`] cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButterworthType {
    /// Lowpass.
    #[default]
    Lowpass,
    /// Highpass.
    Highpass,
}

/// Butterworth filter built from cascaded biquads.
///
/// Section `k` of an order-`N` cascade uses
/// `Q_k = 1 / (2 cos((2k + 1) π / (2N)))`.
///
/// # Example
///
/// ```rust
/// use arbor_core::{Butterworth, ButterworthType, Filter};
///
/// let mut lp = Butterworth::new(48000.0, 1000.0, 4, ButterworthType::Lowpass);
/// assert_eq!(lp.order(), 4);
/// let _ = lp.tick(1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Butterworth {
    sections: [Biquad; Self::MAX_SECTIONS],
    active: usize,
    kind: ButterworthType,
    freq: f32,
    sample_rate: f32,
}

impl Butterworth {
    /// Highest supported order.
    pub const MAX_ORDER: usize = 8;
    const MAX_SECTIONS: usize = Self::MAX_ORDER / 2;

    /// Create a cascade. `order` is rounded up to even and clamped to
    /// `2..=8`; `freq_hz` is clamped below Nyquist.
    pub fn new(sample_rate: f32, freq_hz: f32, order: usize, kind: ButterworthType) -> Self {
        let order = (order.max(2).div_ceil(2) * 2).min(Self::MAX_ORDER);
        let mut filter = Self {
            sections: [Biquad::new(); Self::MAX_SECTIONS],
            active: order / 2,
            kind,
            freq: freq_hz,
            sample_rate,
        };
        filter.set_freq(freq_hz);
        filter
    }

    /// Filter order.
    pub fn order(&self) -> usize {
        self.active * 2
    }

    /// Cutoff frequency in Hz.
    pub fn freq(&self) -> f32 {
        self.freq
    }

    /// Set the cutoff and recompute every section.
    pub fn set_freq(&mut self, freq_hz: f32) {
        self.freq = freq_hz.clamp(1.0, self.sample_rate * 0.499);
        let n = self.order() as f32;
        for (k, section) in self.sections[..self.active].iter_mut().enumerate() {
            let q = 1.0 / (2.0 * cosf((2.0 * k as f32 + 1.0) * PI / (2.0 * n)));
            let coeffs = match self.kind {
                ButterworthType::Lowpass => lowpass_coefficients(self.freq, q, self.sample_rate),
                ButterworthType::Highpass => highpass_coefficients(self.freq, q, self.sample_rate),
            };
            section.set_coefficients(coeffs);
        }
    }

    /// Update the sample rate, keeping the cutoff in Hz.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        let freq = self.freq;
        self.set_freq(freq);
    }
}

impl Filter for Butterworth {
    #[inline]
    fn tick(&mut self, input: f32) -> f32 {
        self.sections[..self.active]
            .iter_mut()
            .fold(input, |x, section| section.tick(x))
    }

    fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }
}
