//! Streaming period tracker built from [`EnvPd`] and [`Snac`].
//!
//! Samples are written one at a time into a caller-owned buffer that is
//! split into frames. Each completed frame is pushed through the envelope
//! estimator and the SNAC detector (whose autocorrelation stream lands in
//! the caller's output buffer at the same position). SNAC estimates then
//! pass an acceptance policy before they replace the reported period:
//!
//! - Estimates below the minimum fidelity are ignored, so silence holds
//!   the last period.
//! - The envelope peak `max` is tracked in dB, decaying by `radius` per
//!   update. A rise of more than the onset threshold marks an onset; the
//!   pass that coincides with it is held, and the first confident estimate
//!   after it is taken unconditionally.
//! - Otherwise estimates within `[1 / pitch_ratio, pitch_ratio]` of the
//!   current period are taken at once, while larger jumps need
//!   `confirm_passes` consecutive passes agreeing with each other.

use arbor_core::{Context, Mempool, PoolError, ms_to_samples};

use crate::env_pd::EnvPd;
use crate::snac::{DEF_OVERLAP, Snac};

/// Default envelope hop in samples.
pub const DEF_HOP_SIZE: usize = 64;
/// Default envelope window in samples.
pub const DEF_WINDOW_SIZE: usize = 64;
/// Default envelope-peak decay time in ms.
pub const DEF_TIME_CONSTANT: f32 = 100.0;
/// Default largest period ratio accepted without confirmation.
pub const DEF_PITCH_RATIO: f32 = 2.0;
/// Default envelope rise, in dB, that marks an onset.
pub const FBA: f32 = 20.0;
/// Default fidelity an estimate needs to be considered.
pub const DEF_MIN_FIDELITY: f32 = 0.5;
/// Default agreeing passes needed before a large jump is taken.
pub const DEF_CONFIRM_PASSES: usize = 3;

/// Relative spread allowed between passes confirming a jump.
const CONFIRM_TOLERANCE: f32 = 0.03;

/// Streaming period tracker over borrowed input and output buffers.
///
/// # Example
///
/// ```rust
/// use arbor_analysis::PeriodDetection;
/// use arbor_core::Context;
///
/// let ctx = Context::new(48000.0);
/// let mut input = vec![0.0f32; 1024];
/// let mut output = vec![0.0f32; 1024];
/// let mut detector = PeriodDetection::new(&ctx, &mut input, &mut output, 256).unwrap();
///
/// let mut period = 0.0;
/// for n in 0..4096 {
///     let x = 0.5 * (std::f32::consts::TAU * n as f32 / 109.0).sin();
///     period = detector.find_period(x);
/// }
/// assert!((period - 109.0).abs() < 1.09);
/// assert!((detector.frequency() - 48000.0 / 109.0).abs() < 5.0);
/// ```
#[derive(Debug)]
pub struct PeriodDetection<'a> {
    env: EnvPd,
    snac: Snac,
    input: &'a mut [f32],
    output: &'a mut [f32],
    frame_size: usize,
    frames_per_buffer: usize,
    cur_block: usize,
    index: usize,
    period: f32,
    sample_rate: f32,
    hop_size: usize,
    window_size: usize,
    time_constant: f32,
    radius: f32,
    max: f32,
    last_max: f32,
    delta_max: f32,
    onset_db: f32,
    onset_pending: bool,
    pitch_ratio: f32,
    min_fidelity: f32,
    confirm_passes: usize,
    pending_period: f32,
    pending_count: usize,
}

impl<'a> PeriodDetection<'a> {
    /// Create a tracker drawing its analysis buffers from the context's
    /// pool.
    ///
    /// `frame_size` is clamped to `1..=input.len()`; the buffer holds
    /// `input.len() / frame_size` frames. An empty `input` is rejected with
    /// [`PoolError::ZeroSized`].
    pub fn new(
        ctx: &Context,
        input: &'a mut [f32],
        output: &'a mut [f32],
        frame_size: usize,
    ) -> Result<Self, PoolError> {
        Self::new_in(ctx, ctx.pool(), input, output, frame_size)
    }

    /// Create a tracker drawing its analysis buffers from `pool`.
    pub fn new_in(
        ctx: &Context,
        pool: &Mempool,
        input: &'a mut [f32],
        output: &'a mut [f32],
        frame_size: usize,
    ) -> Result<Self, PoolError> {
        if input.is_empty() {
            return Err(PoolError::ZeroSized);
        }
        let frame_size = frame_size.clamp(1, input.len());
        let frames_per_buffer = input.len() / frame_size;

        let env = EnvPd::new_in(ctx, pool, DEF_WINDOW_SIZE, DEF_HOP_SIZE, frame_size)?;
        let snac = Snac::new_in(ctx, pool, DEF_OVERLAP)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "period detection: buffer={}, frame={frame_size}, frames={frames_per_buffer}",
            input.len()
        );

        let mut detector = Self {
            hop_size: env.hop_size(),
            window_size: env.window_size(),
            env,
            snac,
            input,
            output,
            frame_size,
            frames_per_buffer,
            cur_block: 0,
            index: 0,
            period: 0.0,
            sample_rate: ctx.sample_rate(),
            time_constant: DEF_TIME_CONSTANT,
            radius: 0.0,
            max: 0.0,
            last_max: 0.0,
            delta_max: 0.0,
            onset_db: FBA,
            onset_pending: false,
            pitch_ratio: DEF_PITCH_RATIO,
            min_fidelity: DEF_MIN_FIDELITY,
            confirm_passes: DEF_CONFIRM_PASSES,
            pending_period: 0.0,
            pending_count: 0,
        };
        detector.update_radius();
        Ok(detector)
    }

    /// Push one sample; returns the current period estimate in samples
    /// (0 until the first estimate is accepted).
    pub fn find_period(&mut self, sample: f32) -> f32 {
        let start = self.cur_block * self.frame_size;
        self.input[start + self.index] = sample;
        self.index += 1;

        if self.index >= self.frame_size {
            self.index = 0;
            let end = start + self.frame_size;
            let frame = &self.input[start..end];
            let out = self
                .output
                .get_mut(start..end.min(self.output.len()))
                .unwrap_or_default();

            self.env.process_block(frame);
            let passes = self.snac.io_samples(frame, out);

            let onset = self.track_envelope();
            if passes > 0 && !onset {
                self.consider(self.snac.period(), self.snac.fidelity());
            }

            self.cur_block = (self.cur_block + 1) % self.frames_per_buffer;
        }

        self.period
    }

    /// Update the decaying envelope peak; returns whether this frame is an
    /// onset.
    fn track_envelope(&mut self) -> bool {
        let level = self.env.tick_db();
        self.last_max = self.max;
        self.max = if level > self.max {
            level
        } else {
            self.max * self.radius
        };
        self.delta_max = self.max - self.last_max;

        let onset = self.delta_max > self.onset_db;
        if onset {
            self.onset_pending = true;
        }
        onset
    }

    fn consider(&mut self, candidate: f32, fidelity: f32) {
        if fidelity < self.min_fidelity || candidate <= 0.0 {
            return;
        }
        if self.onset_pending || self.period <= 0.0 {
            self.accept(candidate);
            return;
        }

        let ratio = candidate / self.period;
        if ratio >= 1.0 / self.pitch_ratio && ratio <= self.pitch_ratio {
            self.accept(candidate);
            return;
        }

        if self.pending_count > 0
            && (candidate / self.pending_period - 1.0).abs() <= CONFIRM_TOLERANCE
        {
            self.pending_count += 1;
        } else {
            self.pending_period = candidate;
            self.pending_count = 1;
        }
        if self.pending_count >= self.confirm_passes {
            self.accept(candidate);
        }
    }

    fn accept(&mut self, candidate: f32) {
        self.period = candidate;
        self.onset_pending = false;
        self.pending_count = 0;
    }

    fn update_radius(&mut self) {
        let time_constant = ms_to_samples(self.time_constant, self.sample_rate);
        self.radius = (-(self.hop_size as f32) / time_constant).exp();
    }

    /// Move the frame cursor back to the start of the buffer.
    fn resync(&mut self) {
        self.cur_block = 0;
        self.index = 0;
    }

    /// Envelope hop. Re-derives the envelope geometry and restarts the
    /// frame cursor, so the partial frame in flight is dropped.
    pub fn set_hop_size(&mut self, hop_size: usize) {
        self.env.reconfigure(self.window_size, hop_size);
        self.hop_size = self.env.hop_size();
        self.window_size = self.env.window_size();
        self.update_radius();
        self.resync();
    }

    /// Envelope window. Same re-sync behaviour as
    /// [`set_hop_size`](Self::set_hop_size).
    pub fn set_window_size(&mut self, window_size: usize) {
        self.env.reconfigure(window_size, self.hop_size);
        self.hop_size = self.env.hop_size();
        self.window_size = self.env.window_size();
        self.update_radius();
        self.resync();
    }

    /// Envelope-peak decay time in ms (at least 1 ms).
    pub fn set_time_constant(&mut self, time_constant_ms: f32) {
        self.time_constant = if time_constant_ms.is_nan() {
            DEF_TIME_CONSTANT
        } else {
            time_constant_ms.max(1.0)
        };
        self.update_radius();
    }

    /// Largest period ratio taken without confirmation (at least 1).
    pub fn set_pitch_ratio(&mut self, pitch_ratio: f32) {
        self.pitch_ratio = if pitch_ratio.is_nan() {
            DEF_PITCH_RATIO
        } else {
            pitch_ratio.max(1.0)
        };
    }

    /// Envelope rise in dB that marks an onset (at least 0).
    pub fn set_onset_threshold(&mut self, onset_db: f32) {
        self.onset_db = if onset_db.is_nan() { FBA } else { onset_db.max(0.0) };
    }

    /// Fidelity an estimate needs to be considered, clamped to `[0, 1]`.
    pub fn set_min_fidelity(&mut self, min_fidelity: f32) {
        self.min_fidelity = if min_fidelity.is_nan() {
            DEF_MIN_FIDELITY
        } else {
            min_fidelity.clamp(0.0, 1.0)
        };
    }

    /// Agreeing passes needed before a large jump is taken (at least 1).
    pub fn set_confirm_passes(&mut self, passes: usize) {
        self.confirm_passes = passes.max(1);
    }

    /// Rate used by [`frequency`](Self::frequency) and the peak decay.
    /// Non-positive rates are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate.is_finite() && sample_rate > 0.0 {
            self.sample_rate = sample_rate;
            self.update_radius();
        }
    }

    /// Accepted period in samples.
    pub fn period(&self) -> f32 {
        self.period
    }

    /// Accepted period as a frequency in Hz; 0 before any estimate.
    pub fn frequency(&self) -> f32 {
        if self.period > 0.0 {
            self.sample_rate / self.period
        } else {
            0.0
        }
    }

    /// Fidelity of the most recent SNAC pass.
    pub fn fidelity(&self) -> f32 {
        self.snac.fidelity()
    }

    /// RMS envelope of the most recent frame.
    pub fn envelope(&self) -> f32 {
        self.env.tick()
    }

    /// Latest rise of the envelope peak in dB.
    pub fn delta_max(&self) -> f32 {
        self.delta_max
    }

    /// Envelope hop in samples.
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Envelope window in samples.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Samples per frame.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// The period detector, for tuning overlap, bias and silence level.
    pub fn snac_mut(&mut self) -> &mut Snac {
        &mut self.snac
    }

    /// The bound input buffer.
    pub fn input(&self) -> &[f32] {
        self.input
    }

    /// The bound output buffer (autocorrelation stream).
    pub fn output(&self) -> &[f32] {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    fn feed(detector: &mut PeriodDetection<'_>, period: f32, len: usize) -> f32 {
        let mut last = 0.0;
        for n in 0..len {
            last = detector.find_period(0.5 * (TAU * n as f32 / period).sin());
        }
        last
    }

    #[test]
    fn geometry_defaults() {
        let ctx = Context::default();
        let mut input = [0.0f32; 1000];
        let mut output = [0.0f32; 1000];
        let detector = PeriodDetection::new(&ctx, &mut input, &mut output, 256).unwrap();
        assert_eq!(detector.frame_size(), 256);
        assert_eq!(detector.hop_size(), DEF_HOP_SIZE);
        assert_eq!(detector.window_size(), DEF_WINDOW_SIZE);
        assert_eq!(detector.period(), 0.0);
        assert_eq!(detector.frequency(), 0.0);
    }

    #[test]
    fn empty_input_is_rejected() {
        let ctx = Context::default();
        let mut output = [0.0f32; 4];
        assert_eq!(
            PeriodDetection::new(&ctx, &mut [], &mut output, 256).unwrap_err(),
            PoolError::ZeroSized
        );
    }

    #[test]
    fn first_estimate_after_onset_is_taken() {
        let ctx = Context::default();
        let mut input = [0.0f32; 1024];
        let mut output = [0.0f32; 1024];
        let mut detector = PeriodDetection::new(&ctx, &mut input, &mut output, 256).unwrap();
        let period = feed(&mut detector, 100.0, 1024);
        assert!((period - 100.0).abs() < 1.0, "{period}");
    }

    #[test]
    fn large_jump_needs_confirmation() {
        let ctx = Context::default();
        let mut input = [0.0f32; 1024];
        let mut output = [0.0f32; 1024];
        let mut detector = PeriodDetection::new(&ctx, &mut input, &mut output, 256).unwrap();
        feed(&mut detector, 100.0, 4096);
        assert!((detector.period() - 100.0).abs() < 1.0);

        // One pass of the new tone is not enough.
        let held = feed(&mut detector, 45.0, 1024);
        assert!((held - 100.0).abs() < 1.0, "{held}");

        let taken = feed(&mut detector, 45.0, 2048);
        assert!((taken - 45.0).abs() < 0.45, "{taken}");
    }

    #[test]
    fn small_change_is_taken_at_once() {
        let ctx = Context::default();
        let mut input = [0.0f32; 1024];
        let mut output = [0.0f32; 1024];
        let mut detector = PeriodDetection::new(&ctx, &mut input, &mut output, 256).unwrap();
        feed(&mut detector, 100.0, 4096);
        let moved = feed(&mut detector, 80.0, 1024);
        assert!((moved - 80.0).abs() < 0.8, "{moved}");
    }

    #[test]
    fn silence_holds_the_period() {
        let ctx = Context::default();
        let mut input = [0.0f32; 512];
        let mut output = [0.0f32; 512];
        let mut detector = PeriodDetection::new(&ctx, &mut input, &mut output, 128).unwrap();
        feed(&mut detector, 64.0, 4096);
        let locked = detector.period();
        for _ in 0..4096 {
            detector.find_period(0.0);
        }
        assert_eq!(detector.period(), locked);
        assert_eq!(detector.fidelity(), 0.0);
        assert_eq!(detector.envelope(), 0.0);
    }

    #[test]
    fn onset_threshold_and_radius() {
        let ctx = Context::default();
        let mut input = [0.0f32; 256];
        let mut output = [0.0f32; 256];
        let mut detector = PeriodDetection::new(&ctx, &mut input, &mut output, 256).unwrap();
        feed(&mut detector, 50.0, 256);
        assert!(detector.delta_max() > FBA);

        detector.set_time_constant(0.0);
        detector.set_pitch_ratio(0.5);
        detector.set_min_fidelity(2.0);
        detector.set_confirm_passes(0);
        assert!(detector.radius > 0.0 && detector.radius < 1.0);
        assert_eq!(detector.pitch_ratio, 1.0);
        assert_eq!(detector.min_fidelity, 1.0);
        assert_eq!(detector.confirm_passes, 1);
    }

    #[test]
    fn reconfiguring_resyncs_the_frame_cursor() {
        let ctx = Context::default();
        let mut input = [0.0f32; 1024];
        let mut output = [0.0f32; 1024];
        let mut detector = PeriodDetection::new(&ctx, &mut input, &mut output, 256).unwrap();
        feed(&mut detector, 100.0, 300);
        detector.set_window_size(128);
        assert_eq!(detector.window_size(), 128);
        assert_eq!((detector.cur_block, detector.index), (0, 0));
        detector.set_hop_size(32);
        assert_eq!(detector.hop_size(), 32);
        let period = feed(&mut detector, 100.0, 4096);
        assert!((period - 100.0).abs() < 1.0);
    }
}
