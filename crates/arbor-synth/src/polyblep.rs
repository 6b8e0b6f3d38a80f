//! PolyBLEP oscillators: cheap band-limiting by polynomial edge correction.
//!
//! Jumps are smoothed with a 4-sample polynomial band-limited step
//! ([`poly_blep`]); the triangle's corners use its integral, the
//! band-limited ramp ([`poly_blamp`]). Neither needs tables or buffers,
//! which makes these the lightest band-limited oscillators in the crate,
//! at the cost of less alias rejection than the minBLEP family.
//!
//! Reference: Välimäki et al., "Antialiasing Oscillators", IEEE Signal
//! Processing Magazine, 2010; Esqueda et al., "Rounding Corners with
//! BLAMP", DAFx 2016.

use arbor_core::Context;

use crate::phasor::wrap_phase;

/// Polynomial step residual for a downward jump of 2 at phase 0.
///
/// Degree-4 pieces, C² continuous, two samples either side of the edge.
/// Subtract it from a naive waveform that falls by 2 at `t = 0`, add it for
/// one that rises by 2.
#[inline]
pub fn poly_blep(t: f32, dt: f32) -> f32 {
    // p1(n) = A4 n^4 + A3 n^3 + A2 n^2 + A0 on [0, 1), p2(n) = C (2 - n)^4 on [1, 2)
    const A4: f32 = -43.0 / 48.0;
    const A3: f32 = 7.0 / 6.0;
    const A2: f32 = 0.5;
    const A0: f32 = -1.0;
    const C: f32 = -11.0 / 48.0;

    let piece = |n: f32| {
        if n < 1.0 {
            let n2 = n * n;
            A4 * n2 * n2 + A3 * n2 * n + A2 * n2 + A0
        } else {
            let u = 2.0 - n;
            let u2 = u * u;
            C * u2 * u2
        }
    };

    if t < 2.0 * dt {
        piece(t / dt)
    } else if t > 1.0 - 2.0 * dt {
        -piece((1.0 - t) / dt)
    } else {
        0.0
    }
}

/// Polynomial ramp residual for a unit change of per-sample slope at phase 0.
///
/// `(1 - |n|)^3 / 6` within one sample of the corner, where `n` is the
/// signed distance in samples.
#[inline]
pub fn poly_blamp(t: f32, dt: f32) -> f32 {
    let n = if t < dt {
        t / dt
    } else if t > 1.0 - dt {
        (1.0 - t) / dt
    } else {
        return 0.0;
    };
    let r = 1.0 - n;
    r * r * r / 6.0
}

macro_rules! phase_accumulator {
    () => {
        /// Set the frequency in Hz.
        pub fn set_freq(&mut self, freq: f32) {
            self.freq = freq;
            self.inc = (freq * self.inv_sample_rate).clamp(0.0, 0.5);
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

        #[inline]
        fn advance(&mut self) {
            self.phase += self.inc;
            if self.phase >= 1.0 {
                self.phase -= 1.0;
            }
        }
    };
}

/// PolyBLAMP triangle with adjustable skew.
///
/// `skew` in `[-1, 1]` moves the peak: 0 is symmetric, +-1 approach saws.
#[derive(Debug, Clone)]
pub struct PolyTri {
    phase: f32,
    inc: f32,
    freq: f32,
    skew: f32,
    inv_sample_rate: f32,
}

impl PolyTri {
    /// Create a symmetric 440 Hz triangle.
    pub fn new(ctx: &Context) -> Self {
        let mut osc = Self {
            phase: 0.0,
            inc: 0.0,
            freq: 0.0,
            skew: 0.0,
            inv_sample_rate: ctx.inv_sample_rate(),
        };
        osc.set_freq(440.0);
        osc
    }

    phase_accumulator!();

    /// Set the skew, clamped to `[-1, 1]`.
    pub fn set_skew(&mut self, skew: f32) {
        self.skew = skew.clamp(-1.0, 1.0);
    }

    /// Generate the next sample.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        let dt = self.inc;
        let p = self.phase;
        let peak = (0.5 * (1.0 + self.skew)).clamp(dt.max(1e-6), 1.0 - dt.max(1e-6));

        let mut out = if p < peak {
            -1.0 + 2.0 * p / peak
        } else {
            1.0 - 2.0 * (p - peak) / (1.0 - peak)
        };

        // Slope change per sample at each corner.
        let bend = 2.0 * (1.0 / peak + 1.0 / (1.0 - peak)) * dt;
        out += bend * poly_blamp(p, dt);
        out -= bend * poly_blamp(wrap_phase(p - peak), dt);

        self.advance();
        out
    }
}

/// PolyBLEP pulse with adjustable width.
#[derive(Debug, Clone)]
pub struct PolyPulse {
    phase: f32,
    inc: f32,
    freq: f32,
    width: f32,
    inv_sample_rate: f32,
}

impl PolyPulse {
    /// Create a 440 Hz square.
    pub fn new(ctx: &Context) -> Self {
        let mut osc = Self {
            phase: 0.0,
            inc: 0.0,
            freq: 0.0,
            width: 0.5,
            inv_sample_rate: ctx.inv_sample_rate(),
        };
        osc.set_freq(440.0);
        osc
    }

    phase_accumulator!();

    /// Fraction of the cycle spent high, clamped to `[0.01, 0.99]`.
    pub fn set_width(&mut self, width: f32) {
        self.width = width.clamp(0.01, 0.99);
    }

    /// Generate the next sample.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        let dt = self.inc;
        let p = self.phase;
        let naive = if p < self.width { 1.0 } else { -1.0 };
        let out = naive + poly_blep(p, dt) - poly_blep(wrap_phase(p - self.width), dt);
        self.advance();
        out
    }
}

/// PolyBLEP rising sawtooth.
#[derive(Debug, Clone)]
pub struct PolySaw {
    phase: f32,
    inc: f32,
    freq: f32,
    inv_sample_rate: f32,
}

impl PolySaw {
    /// Create a 440 Hz sawtooth.
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

    phase_accumulator!();

    /// Generate the next sample.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        let out = 2.0 * self.phase - 1.0 - poly_blep(self.phase, self.inc);
        self.advance();
        out
    }
}
