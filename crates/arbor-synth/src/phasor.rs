//! Phase accumulators: the raw ramp and the sine built on it.

use arbor_core::Context;
use core::f32::consts::TAU;
use libm::{floorf, sinf};

/// Wrap a phase into `[0, 1)`, for either direction of travel.
#[inline]
pub(crate) fn wrap_phase(phase: f32) -> f32 {
    let wrapped = phase - floorf(phase);
    // floorf can leave exactly 1.0 for tiny negative inputs
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// Aliasing ramp from 0 to 1.
///
/// Useful as a control signal or as the phase source for a waveshaper.
/// [`did_reset`](Self::did_reset) reports the sample on which the ramp wrapped.
///
/// ```rust
/// use arbor_core::Context;
/// use arbor_synth::Phasor;
///
/// let ctx = Context::new(48000.0);
/// let mut ramp = Phasor::new(&ctx);
/// ramp.set_freq(12000.0);
/// let out: Vec<f32> = (0..4).map(|_| ramp.tick()).collect();
/// assert_eq!(out, [0.25, 0.5, 0.75, 0.0]);
/// assert!(ramp.did_reset());
/// ```
#[derive(Debug, Clone)]
pub struct Phasor {
    phase: f32,
    inc: f32,
    freq: f32,
    inv_sample_rate: f32,
    did_reset: bool,
}

impl Phasor {
    /// Create a phasor at 440 Hz, phase 0.
    pub fn new(ctx: &Context) -> Self {
        let mut osc = Self {
            phase: 0.0,
            inc: 0.0,
            freq: 0.0,
            inv_sample_rate: ctx.inv_sample_rate(),
            did_reset: false,
        };
        osc.set_freq(440.0);
        osc
    }

    /// Advance and return the new phase.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        self.phase += self.inc;
        self.did_reset = false;
        if self.phase >= 1.0 || self.phase < 0.0 {
            self.phase = wrap_phase(self.phase);
            self.did_reset = true;
        }
        self.phase
    }

    /// Set the frequency in Hz. Negative values run the ramp backwards.
    pub fn set_freq(&mut self, freq: f32) {
        self.freq = freq;
        self.inc = freq * self.inv_sample_rate;
    }

    /// Current frequency in Hz.
    pub fn freq(&self) -> f32 {
        self.freq
    }

    /// Jump to a phase; wrapped into `[0, 1)`.
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = wrap_phase(phase);
    }

    /// Current phase.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Whether the last tick wrapped.
    pub fn did_reset(&self) -> bool {
        self.did_reset
    }

    /// Re-derive the increment from the stored frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate > 0.0 {
            self.inv_sample_rate = 1.0 / sample_rate;
            self.set_freq(self.freq);
        }
    }
}

/// Sine oscillator.
///
/// Output starts at `sin(0)` and advances afterwards, so a freshly built
/// cycle always begins at zero crossing.
#[derive(Debug, Clone)]
pub struct Cycle {
    phase: f32,
    inc: f32,
    freq: f32,
    inv_sample_rate: f32,
}

impl Cycle {
    /// Create a 440 Hz sine.
    pub fn new(ctx: &Context) -> Self {
        let mut osc = Self {
            phase: 0.0,
            inc: 0.0,
            freq: 0.0,
            inv_sample_rate: ctx.inv_sample_rate(),
        };
        osc.set_freq(440.0);
        osc
    }

    /// Generate the next sample.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        let out = sinf(TAU * self.phase);
        self.phase += self.inc;
        if self.phase >= 1.0 || self.phase < 0.0 {
            self.phase = wrap_phase(self.phase);
        }
        out
    }

    /// Set the frequency in Hz.
    pub fn set_freq(&mut self, freq: f32) {
        self.freq = freq;
        self.inc = freq * self.inv_sample_rate;
    }

    /// Current frequency in Hz.
    pub fn freq(&self) -> f32 {
        self.freq
    }

    /// Jump to a phase; wrapped into `[0, 1)`.
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = wrap_phase(phase);
    }

    /// Re-derive the increment from the stored frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate > 0.0 {
            self.inv_sample_rate = 1.0 / sample_rate;
            self.set_freq(self.freq);
        }
    }
}
