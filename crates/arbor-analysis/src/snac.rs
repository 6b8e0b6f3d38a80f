//! Period detection by specially normalised autocorrelation (SNAC).
//!
//! Input streams into a circular analysis frame. Every `frame_size /
//! overlap` samples one analysis pass runs over the whole frame:
//!
//! 1. The frame is unrolled oldest-first. If its RMS is below `min_rms` the
//!    pass stops here: fidelity drops to 0 and the period is held.
//! 2. The autocorrelation is computed in the spectral domain: the frame is
//!    zero-padded to twice its length, transformed, reduced to its power
//!    spectrum and transformed back.
//! 3. Each lag is normalised by the energies of the two overlapping
//!    segments,
//!
//!    ```text
//!    r(k) = sum x[i] x[i+k] / sqrt(sum x[i]^2 * sum x[i+k]^2)
//!    ```
//!
//!    using running sums, for lags below `SEEK * frame_size`.
//! 4. After the main lobe (until `r` first goes negative) every local
//!    maximum is weighted by a bias that falls off linearly with lag. The
//!    first peak whose weighted height reaches [`PEAK_FLOOR_RATIO`] of the
//!    highest one is the period, which favours the fundamental over its
//!    multiples.
//! 5. A parabola through the peak and its neighbours gives the fractional
//!    period; its height is the fidelity.
//!
//! Transforms are planned and scratch space reserved at construction, so a
//! pass never allocates.
//!
//! Reference: McLeod & Wyvill, "A Smarter Way to Find Pitch", ICMC 2005.

use std::fmt;
use std::sync::Arc;

use arbor_core::{Context, Mempool, PoolBuffer, PoolError};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Analysis frame length.
pub const SNAC_FRAME_SIZE: usize = 1024;
/// Default passes per frame.
pub const DEF_OVERLAP: usize = 1;
/// Default long-lag discount.
pub const DEF_BIAS: f32 = 0.2;
/// Default RMS below which a frame is treated as silence.
pub const DEF_MIN_RMS: f32 = 0.003;
/// Longest searched lag as a fraction of the frame.
pub const SEEK: f32 = 0.85;
/// Shortest trackable period in samples.
pub const MIN_PERIOD: usize = 5;
/// A peak qualifies when its weighted height reaches this share of the
/// highest weighted peak.
pub const PEAK_FLOOR_RATIO: f32 = 0.9;
/// Largest accepted overlap.
pub const MAX_OVERLAP: usize = crate::env_pd::MAX_OVERLAP;

/// Streaming SNAC period detector.
///
/// # Example
///
/// ```rust
/// use arbor_analysis::Snac;
/// use arbor_core::Context;
///
/// let ctx = Context::new(48000.0);
/// let mut snac = Snac::new(&ctx, 2).unwrap();
///
/// let tone: Vec<f32> = (0..4096)
///     .map(|n| (std::f32::consts::TAU * n as f32 / 80.0).sin())
///     .collect();
/// let mut acf = vec![0.0; tone.len()];
/// let passes = snac.io_samples(&tone, &mut acf);
///
/// assert_eq!(passes, 8);
/// assert!((snac.period() - 80.0).abs() < 0.8);
/// assert!(snac.fidelity() > 0.9);
/// ```
pub struct Snac {
    input: PoolBuffer<f32>,
    process: PoolBuffer<f32>,
    bias: PoolBuffer<f32>,
    spectrum: PoolBuffer<Complex<f32>>,
    scratch: PoolBuffer<Complex<f32>>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    time_index: usize,
    frame_size: usize,
    overlap: usize,
    period_index: usize,
    period_length: f32,
    fidelity: f32,
    bias_factor: f32,
    min_rms: f32,
}

impl Snac {
    /// Create a detector from the context's pool.
    pub fn new(ctx: &Context, overlap: usize) -> Result<Self, PoolError> {
        Self::new_in(ctx, ctx.pool(), overlap)
    }

    /// Create a detector from `pool`.
    pub fn new_in(ctx: &Context, pool: &Mempool, overlap: usize) -> Result<Self, PoolError> {
        let frame_size = SNAC_FRAME_SIZE;
        let padded = frame_size * 2;

        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(padded);
        let inverse = planner.plan_fft_inverse(padded);
        let scratch_len = forward
            .get_inplace_scratch_len()
            .max(inverse.get_inplace_scratch_len())
            .max(1);

        #[cfg(feature = "tracing")]
        tracing::debug!("snac: frame={frame_size}, fft={padded}, scratch={scratch_len}");

        let mut snac = Self {
            input: ctx.alloc(pool, frame_size)?,
            process: ctx.alloc(pool, frame_size)?,
            bias: ctx.alloc(pool, frame_size)?,
            spectrum: ctx.alloc(pool, padded)?,
            scratch: ctx.alloc(pool, scratch_len)?,
            forward,
            inverse,
            time_index: 0,
            frame_size,
            overlap: DEF_OVERLAP,
            period_index: 0,
            period_length: 0.0,
            fidelity: 0.0,
            bias_factor: DEF_BIAS,
            min_rms: DEF_MIN_RMS,
        };
        snac.set_overlap(overlap);
        snac.fill_bias();
        Ok(snac)
    }

    /// Feed `input`; returns how many analysis passes ran.
    ///
    /// `output[n]` receives the normalised autocorrelation value the frame
    /// cursor pointed at before `input[n]` was stored, i.e. the last
    /// completed pass streamed out one lag per sample. Output positions
    /// past `output.len()` are skipped.
    pub fn io_samples(&mut self, input: &[f32], output: &mut [f32]) -> usize {
        let mut passes = 0;
        for (n, &x) in input.iter().enumerate() {
            if let Some(out) = output.get_mut(n) {
                *out = self.process[self.time_index];
            }
            self.input[self.time_index] = x;
            self.time_index = (self.time_index + 1) % self.frame_size;
            if self.time_index % self.hop_size() == 0 {
                self.analyze_frame();
                passes += 1;
            }
        }
        passes
    }

    fn analyze_frame(&mut self) {
        let n = self.frame_size;
        let start = self.time_index;
        for (i, sample) in self.process.iter_mut().enumerate() {
            *sample = self.input[(start + i) % n];
        }

        let energy: f64 = self.process.iter().map(|&x| f64::from(x * x)).sum();
        let rms = (energy / n as f64).sqrt() as f32;
        if rms.is_nan() || rms < self.min_rms {
            self.process.fill(0.0);
            self.period_index = 0;
            self.fidelity = 0.0;
            return;
        }

        self.autocorrelate();
        self.normalize(energy);
        self.pick_peak();
        self.period_and_fidelity();
    }

    /// Leaves the raw autocorrelation in the real parts of `spectrum`.
    fn autocorrelate(&mut self) {
        let n = self.frame_size;
        let (frame, padding) = self.spectrum.split_at_mut(n);
        for (bin, &x) in frame.iter_mut().zip(self.process.iter()) {
            *bin = Complex::new(x, 0.0);
        }
        padding.fill(Complex::default());

        self.forward
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);
        for bin in self.spectrum.iter_mut() {
            *bin = Complex::new(bin.norm_sqr(), 0.0);
        }
        self.inverse
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);
    }

    /// Normalise lags `1..seek` against the segment energies and store the
    /// result in `process`. `process` still holds the frame on entry.
    fn normalize(&mut self, energy: f64) {
        let n = self.frame_size;
        let seek = self.seek();
        // The inverse transform is unscaled.
        let scale = 1.0 / self.spectrum.len() as f64;

        let mut head = energy;
        let mut tail = energy;
        self.spectrum[0].re = 1.0;
        for k in 1..seek {
            let early = f64::from(self.process[k - 1]);
            let late = f64::from(self.process[n - k]);
            tail -= early * early;
            head -= late * late;
            let denom = (head.max(0.0) * tail.max(0.0)).sqrt();
            let acf = f64::from(self.spectrum[k].re) * scale;
            self.spectrum[k].re = if denom > f64::from(f32::MIN_POSITIVE) {
                (acf / denom) as f32
            } else {
                0.0
            };
        }

        for (out, bin) in self.process[..seek].iter_mut().zip(self.spectrum.iter()) {
            *out = bin.re;
        }
        self.process[seek..].fill(0.0);
    }

    fn pick_peak(&mut self) {
        let seek = self.seek();
        let r = &self.process;

        let mut lobe_end = 1;
        while lobe_end < seek && r[lobe_end] >= 0.0 {
            lobe_end += 1;
        }

        let weighted = |k: usize| parabolic_peak(r[k - 1], r[k], r[k + 1]).1 * self.bias[k];
        let is_peak = |k: usize| r[k] >= r[k - 1] && r[k] > r[k + 1];
        let candidates = lobe_end.max(1)..seek.saturating_sub(1);

        let highest = candidates
            .clone()
            .filter(|&k| is_peak(k))
            .map(weighted)
            .fold(0.0f32, f32::max);

        self.period_index = if highest > 0.0 {
            let floor = PEAK_FLOOR_RATIO * highest;
            candidates
                .filter(|&k| is_peak(k))
                .find(|&k| weighted(k) >= floor)
                .unwrap_or(0)
        } else {
            0
        };
    }

    fn period_and_fidelity(&mut self) {
        let k = self.period_index;
        if k == 0 {
            self.fidelity = 0.0;
            return;
        }
        let r = &self.process;
        let (offset, height) = parabolic_peak(r[k - 1], r[k], r[k + 1]);
        self.period_length = k as f32 + offset;
        self.fidelity = height.clamp(0.0, 1.0);
    }

    fn fill_bias(&mut self) {
        let frame = self.frame_size as f32;
        let factor = self.bias_factor;
        for (k, b) in self.bias.iter_mut().enumerate() {
            *b = if k < MIN_PERIOD {
                0.0
            } else {
                1.0 - factor * k as f32 / frame
            };
        }
    }

    fn seek(&self) -> usize {
        (self.frame_size as f32 * SEEK) as usize
    }

    /// Period of the last confident pass, in samples; 0 before any.
    #[inline]
    pub fn period(&self) -> f32 {
        self.period_length
    }

    /// Confidence of the last pass in `[0, 1]`; 0 for silence or when no
    /// peak qualified.
    #[inline]
    pub fn fidelity(&self) -> f32 {
        self.fidelity
    }

    /// Passes per frame, rounded down to a power of two in
    /// `1..=MAX_OVERLAP`. Takes effect from the next sample.
    pub fn set_overlap(&mut self, overlap: usize) {
        let clamped = overlap.clamp(1, MAX_OVERLAP);
        let mut lap = 1 << (usize::BITS - 1 - clamped.leading_zeros());
        while self.frame_size % lap != 0 {
            lap >>= 1;
        }

        #[cfg(feature = "tracing")]
        if lap != overlap {
            tracing::warn!("snac: overlap {overlap} clamped to {lap}");
        }

        self.overlap = lap;
    }

    /// Passes per frame.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Samples between passes.
    #[inline]
    pub fn hop_size(&self) -> usize {
        self.frame_size / self.overlap
    }

    /// Long-lag discount, clamped to `[0, 1]`.
    pub fn set_bias(&mut self, bias: f32) {
        self.bias_factor = if bias.is_nan() { DEF_BIAS } else { bias.clamp(0.0, 1.0) };
        self.fill_bias();
    }

    /// Long-lag discount.
    pub fn bias(&self) -> f32 {
        self.bias_factor
    }

    /// Silence threshold; negative values become 0.
    pub fn set_min_rms(&mut self, min_rms: f32) {
        self.min_rms = if min_rms.is_nan() { DEF_MIN_RMS } else { min_rms.max(0.0) };
    }

    /// Silence threshold.
    pub fn min_rms(&self) -> f32 {
        self.min_rms
    }

    /// Analysis frame length.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}

impl fmt::Debug for Snac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snac")
            .field("frame_size", &self.frame_size)
            .field("overlap", &self.overlap)
            .field("time_index", &self.time_index)
            .field("period_length", &self.period_length)
            .field("fidelity", &self.fidelity)
            .field("bias_factor", &self.bias_factor)
            .field("min_rms", &self.min_rms)
            .finish_non_exhaustive()
    }
}

/// Vertex of the parabola through `(-1, a)`, `(0, b)`, `(1, c)`, as
/// `(offset, height)`. Non-concave triples return `(0, b)`.
fn parabolic_peak(a: f32, b: f32, c: f32) -> (f32, f32) {
    let curvature = a - 2.0 * b + c;
    if curvature >= 0.0 {
        return (0.0, b);
    }
    let offset = 0.5 * (a - c) / curvature;
    (offset, b - 0.25 * (a - c) * offset)
}
