//! Analysis window functions.
//!
//! All windows are periodic (`w[n] = w[0]` would be sample `n`), which is the
//! form wanted for overlapped analysis frames.

use core::f32::consts::PI;
use libm::cosf;

/// Window function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    /// Rectangular (no windowing)
    Rectangular,
    /// Hann window (raised cosine)
    #[default]
    Hann,
    /// Hamming window
    Hamming,
    /// Blackman window
    Blackman,
}

impl Window {
    /// Value of sample `i` of an `n`-point window.
    #[inline]
    pub fn coefficient(self, i: usize, n: usize) -> f32 {
        if n == 0 {
            return 0.0;
        }
        let x = 2.0 * PI * i as f32 / n as f32;
        match self {
            Window::Rectangular => 1.0,
            Window::Hann => 0.5 * (1.0 - cosf(x)),
            Window::Hamming => 0.54 - 0.46 * cosf(x),
            Window::Blackman => 0.42 - 0.5 * cosf(x) + 0.08 * cosf(2.0 * x),
        }
    }

    /// Multiply a buffer by the window in place.
    pub fn apply(self, buffer: &mut [f32]) {
        let n = buffer.len();
        if self == Window::Rectangular {
            return;
        }
        for (i, sample) in buffer.iter_mut().enumerate() {
            *sample *= self.coefficient(i, n);
        }
    }

    /// Write the raw coefficients into `out` (window length = `out.len()`).
    pub fn fill_coefficients(self, out: &mut [f32]) {
        let n = out.len();
        for (i, w) in out.iter_mut().enumerate() {
            *w = self.coefficient(i, n);
        }
    }

    /// Write coefficients scaled so they sum to one.
    ///
    /// Weighting a mean-square by these gives a weighted average whose value
    /// for a constant-power signal equals that power.
    pub fn fill_normalized(self, out: &mut [f32]) {
        self.fill_coefficients(out);
        let sum: f32 = out.iter().sum();
        if sum > 0.0 {
            let inv = 1.0 / sum;
            for w in out.iter_mut() {
                *w *= inv;
            }
        }
    }
}
