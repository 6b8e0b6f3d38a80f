//! Minimum-phase band-limited step (minBLEP) correction buffer.
//!
//! Every discontinuity an oscillator produces, whether a jump in value or a
//! change of slope, is written into a short accumulation buffer as a
//! precomputed correction kernel placed at the edge's sub-sample position.
//! The naive waveform is added [`SAMPLE_DELAY`] samples later, and each tick
//! drains one sample from the head of the buffer. The sum is the naive
//! waveform convolved with a minimum-phase lowpass, so edges arrive
//! band-limited without any lookahead.
//!
//! ```text
//!   buffer: [ drained | j | j+1 ... j+DELAY ... j+KERNEL-1 | headroom ]
//!                       ^ read + write cursor                ^ FILL_LEN + KERNEL
//! ```
//!
//! When the cursor reaches [`FILL_LEN`], the pending kernel tail is copied
//! back to the start and the rest is zeroed, so a placement at the cursor
//! always fits.
//!
//! A minimum-phase filter delays a ramp by its centroid rather than by
//! [`SAMPLE_DELAY`], so a slope change leaves a permanent offset behind
//! instead of decaying to zero. The ramp kernel is stored without that
//! offset; [`BlepBuffer::drain`] adds it back from the waveform's current
//! slope, and places a ramp kernel itself whenever the slope moved without
//! a corner (start-up, frequency or width changes).
//!
//! The kernels are generated at build time (windowed sinc, real cepstrum,
//! minimum phase, integration) with 64 sub-sample phases and linear
//! interpolation between them.
//!
//! Reference: Eli Brandt, "Hard Sync Without Aliasing", ICMC 2001.

mod tables {
    include!(concat!(env!("OUT_DIR"), "/minblep_tables.rs"));
}

use tables::{SLOPE_DD, SLOPE_TAIL, STEP_DD_DELTA, STEP_DD_VALUE};

/// Sub-sample resolution of the correction kernels.
pub const PHASES: usize = 64;
/// Length of a correction kernel in samples.
pub const KERNEL_LENGTH: usize = 72;
/// Delay, in samples, of the naive waveform behind the kernel start.
pub const SAMPLE_DELAY: usize = 4;
/// Samples drained between compactions.
pub const FILL_LEN: usize = 256;

/// Lowest and highest per-sample phase increment an oscillator runs at.
pub(crate) const MIN_INC: f32 = 1e-5;
pub(crate) const MAX_INC: f32 = 0.5;

/// Slope drift, per sample, below which no ramp kernel is placed.
const SLOPE_EPSILON: f32 = 1e-6;

/// Accumulation buffer with its cursor and the output smoothing state.
#[derive(Debug, Clone)]
pub(crate) struct BlepBuffer {
    buf: [f32; FILL_LEN + KERNEL_LENGTH],
    j: usize,
    z: f32,
    /// Per-sample slope the placed ramp kernels account for.
    slope: f32,
}

impl BlepBuffer {
    pub(crate) const fn new() -> Self {
        Self {
            buf: [0.0; FILL_LEN + KERNEL_LENGTH],
            j: 0,
            z: 0.0,
            slope: 0.0,
        }
    }

    /// Cursor position, always `< FILL_LEN`.
    #[inline]
    pub(crate) fn write_index(&self) -> usize {
        self.j
    }

    /// Split `phase / inc` (samples since the edge) into a table phase and
    /// an interpolation fraction.
    #[inline]
    fn kernel_phase(phase: f32, inc: f32) -> (usize, f32) {
        let r = PHASES as f32 * phase / inc;
        let i = libm::floorf(r);
        let frac = r - i;
        // Heavy sync can push the edge slightly outside the current sample.
        let i = if i < 0.0 {
            0
        } else if i >= PHASES as f32 {
            PHASES - 1
        } else {
            i as usize
        };
        (i, frac.clamp(0.0, 1.0))
    }

    /// Add a step of height `scale` that happened `phase / inc` samples ago.
    #[inline]
    pub(crate) fn place_step(&mut self, phase: f32, inc: f32, scale: f32) {
        let (i, frac) = Self::kernel_phase(phase, inc);
        let dst = &mut self.buf[self.j..self.j + KERNEL_LENGTH];
        for (m, out) in dst.iter_mut().enumerate() {
            let k = i + m * PHASES;
            *out += scale * (STEP_DD_VALUE[k] + frac * STEP_DD_DELTA[k]);
        }
    }

    /// Add a slope change of `slope_delta` (per unit phase) that happened
    /// `phase / inc` samples ago.
    #[inline]
    pub(crate) fn place_slope(&mut self, phase: f32, inc: f32, slope_delta: f32) {
        let (i, frac) = Self::kernel_phase(phase, inc);
        self.place_ramp(i, frac, slope_delta * inc);
    }

    #[inline]
    fn place_ramp(&mut self, i: usize, frac: f32, scale: f32) {
        let dst = &mut self.buf[self.j..self.j + KERNEL_LENGTH];
        for (m, out) in dst.iter_mut().enumerate() {
            let k = i + m * PHASES;
            *out += scale * (SLOPE_DD[k] + frac * (SLOPE_DD[k + 1] - SLOPE_DD[k]));
        }
        self.slope += scale;
    }

    /// Add this tick's naive waveform value and drain one smoothed sample.
    ///
    /// `slope` is the naive waveform's current rise per sample.
    #[inline]
    pub(crate) fn drain(&mut self, naive: f32, slope: f32) -> f32 {
        let drift = slope - self.slope;
        if drift.abs() > SLOPE_EPSILON {
            self.place_ramp(0, 0.0, drift);
        }
        self.slope = slope;

        self.buf[self.j + SAMPLE_DELAY] += naive;
        let y = self.buf[self.j] + slope * SLOPE_TAIL;
        self.z += 0.5 * (y - self.z);

        self.j += 1;
        if self.j == FILL_LEN {
            self.j = 0;
            self.buf.copy_within(FILL_LEN.., 0);
            self.buf[KERNEL_LENGTH..].fill(0.0);
        }
        self.z
    }

    pub(crate) fn reset(&mut self) {
        self.buf.fill(0.0);
        self.j = 0;
        self.z = 0.0;
        self.slope = 0.0;
    }
}

/// Per-sample phase increment for `freq`, clamped to the range the kernels
/// can represent.
#[inline]
pub(crate) fn phase_increment(freq: f32, inv_sample_rate: f32) -> f32 {
    let inc = freq * inv_sample_rate;
    if inc.is_nan() {
        MIN_INC
    } else {
        inc.clamp(MIN_INC, MAX_INC)
    }
}

/// Latched hard-sync input. Values in `(0, 1]` give how many samples ago the
/// master wrapped; anything else means "no sync".
#[inline]
pub(crate) fn sanitize_sync(value: f32) -> f32 {
    if value > 0.0 && value <= 1.0 { value } else { 0.0 }
}
