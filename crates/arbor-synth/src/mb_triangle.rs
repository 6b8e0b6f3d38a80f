//! Band-limited triangle oscillator with hard sync.
//!
//! The triangle's corners are slope discontinuities, so they are corrected
//! with the integrated (ramp) minBLEP kernel. A hard-sync reset can also jump
//! the value, which adds an ordinary step correction.

use arbor_core::Context;

use crate::minblep::{BlepBuffer, phase_increment, sanitize_sync};

/// Hard-syncable minBLEP triangle oscillator.
///
/// `width` in `[-1, 1]` skews the peak position: -1 approaches a falling
/// saw, 0 is symmetric, 1 approaches a rising saw.
#[derive(Debug, Clone)]
pub struct MbTriangle {
    buffer: BlepBuffer,
    phase: f32,
    inc: f32,
    freq: f32,
    width: f32,
    falling: bool,
    sync_in: f32,
    sync_out: f32,
    inv_sample_rate: f32,
}

impl MbTriangle {
    /// Create a 440 Hz symmetric triangle.
    pub fn new(ctx: &Context) -> Self {
        let mut osc = Self {
            buffer: BlepBuffer::new(),
            phase: 0.0,
            inc: 0.0,
            freq: 440.0,
            width: 0.0,
            falling: false,
            sync_in: 0.0,
            sync_out: 0.0,
            inv_sample_rate: ctx.inv_sample_rate(),
        };
        osc.set_freq(440.0);
        osc
    }

    /// Set the frequency in Hz.
    pub fn set_freq(&mut self, freq: f32) {
        self.freq = freq;
        self.inc = phase_increment(freq, self.inv_sample_rate);
    }

    /// Current frequency in Hz.
    pub fn freq(&self) -> f32 {
        self.freq
    }

    /// Set the skew, clamped to `[-1, 1]`.
    pub fn set_width(&mut self, width: f32) {
        self.width = width.clamp(-1.0, 1.0);
    }

    /// Re-derive the increment from the stored frequency.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate > 0.0 {
            self.inv_sample_rate = 1.0 / sample_rate;
            self.set_freq(self.freq);
        }
    }

    /// Hard-sync on the next tick (see [`MbPulse::sync_in`](crate::MbPulse::sync_in)).
    pub fn sync_in(&mut self, offset: f32) {
        self.sync_in = sanitize_sync(offset);
    }

    /// Sub-sample wrap offset of the last tick, or 0 if it did not wrap.
    pub fn sync_out(&self) -> f32 {
        self.sync_out
    }

    /// Current phase in `[0, 1)`.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Position of the correction buffer cursor.
    pub fn write_index(&self) -> usize {
        self.buffer.write_index()
    }

    /// Return to phase 0 with an empty correction buffer.
    pub fn reset(&mut self) {
        self.buffer.reset();
        self.phase = 0.0;
        self.falling = false;
        self.sync_in = 0.0;
        self.sync_out = 0.0;
    }

    /// Generate the next sample.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        let w = self.inc;
        let b = (0.5 * (1.0 + self.width)).clamp(w, 1.0 - w);
        let corner = 1.0 / b + 1.0 / (1.0 - b);
        let rising_at = |p: f32| -0.5 + p / b;
        let falling_at = |p: f32| 0.5 - (p - b) / (1.0 - b);
        let mut p = self.phase;
        let sync = core::mem::take(&mut self.sync_in);

        if sync > 0.0 {
            let offset = sync * w;
            let mut p_at_reset = p - offset;
            p = offset;

            // Value at the instant of the reset, after any corners that fell
            // inside this sample before it.
            let mut x;
            if self.falling {
                x = falling_at(p_at_reset);
                if p_at_reset >= 1.0 {
                    p_at_reset -= 1.0;
                    x = rising_at(p_at_reset);
                    self.buffer.place_slope(p_at_reset + offset, w, corner);
                    self.falling = false;
                }
                if !self.falling && p_at_reset >= b {
                    x = falling_at(p_at_reset);
                    self.buffer.place_slope(p_at_reset - b + offset, w, -corner);
                    self.falling = true;
                }
            } else {
                x = rising_at(p_at_reset);
                if p_at_reset >= b {
                    x = falling_at(p_at_reset);
                    self.buffer.place_slope(p_at_reset - b + offset, w, -corner);
                    self.falling = true;
                }
                if p_at_reset >= 1.0 {
                    p_at_reset -= 1.0;
                    x = rising_at(p_at_reset);
                    self.buffer.place_slope(p_at_reset + offset, w, corner);
                    self.falling = false;
                }
            }

            // Reset: back to the bottom of the rising segment.
            if self.falling {
                self.buffer.place_slope(p, w, corner);
            }
            self.buffer.place_step(p, w, -0.5 - x);
            self.falling = false;
            if p >= b {
                self.buffer.place_slope(p - b, w, -corner);
                self.falling = true;
            }
            self.sync_out = sync;
        } else {
            if !self.falling && p >= b {
                self.buffer.place_slope(p - b, w, -corner);
                self.falling = true;
            }
            if self.falling && p >= 1.0 {
                p -= 1.0;
                self.sync_out = p / w + 1e-20;
                self.buffer.place_slope(p, w, corner);
                self.falling = false;
                if p >= b {
                    self.buffer.place_slope(p - b, w, -corner);
                    self.falling = true;
                }
            } else {
                self.sync_out = 0.0;
            }
        }

        let (naive, slope) = if self.falling {
            (falling_at(p), -w / (1.0 - b))
        } else {
            (rising_at(p), w / b)
        };
        let out = self.buffer.drain(naive, slope);
        self.phase = p + w;
        2.0 * out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_triangle_spans_unit_range() {
        let ctx = Context::new(48000.0);
        let mut osc = MbTriangle::new(&ctx);
        osc.set_freq(375.0);
        let out: Vec<f32> = (0..4096).map(|_| osc.tick()).collect();
        let steady = &out[2048..];
        let max = steady.iter().copied().fold(f32::MIN, f32::max);
        let min = steady.iter().copied().fold(f32::MAX, f32::min);
        assert!(max > 0.95 && max < 1.05, "max {max}");
        assert!(min < -0.95 && min > -1.05, "min {min}");
    }

    #[test]
    fn steady_state_has_no_dc() {
        let ctx = Context::new(48000.0);
        let mut osc = MbTriangle::new(&ctx);
        osc.set_freq(375.0);
        for _ in 0..2048 {
            osc.tick();
        }
        let mean: f32 = (0..1280).map(|_| osc.tick()).sum::<f32>() / 1280.0;
        assert!(mean.abs() < 0.01, "mean {mean}");
    }

    #[test]
    fn synced_triangle_restarts_at_bottom() {
        let ctx = Context::new(48000.0);
        let mut osc = MbTriangle::new(&ctx);
        osc.set_freq(200.0);
        for _ in 0..300 {
            osc.tick();
        }
        osc.sync_in(1.0);
        osc.tick();
        assert!(osc.phase() < 2.0 * 200.0 / 48000.0 + 1e-6);
        for _ in 0..20 {
            osc.tick();
        }
        assert!(osc.write_index() < crate::minblep::FILL_LEN);
    }

    #[test]
    fn one_sample_segments_stay_within_unit_range() {
        // At width ±0.99 one segment is clamped to a single sample.
        let ctx = Context::new(48000.0);
        for width in [0.99, -0.99, 1.0, -1.0] {
            let mut osc = MbTriangle::new(&ctx);
            osc.set_freq(440.0);
            osc.set_width(width);
            let peak = (0..20_000).map(|_| osc.tick().abs()).fold(0.0, f32::max);
            assert!(peak < 1.05, "width {width}: peak {peak}");
        }
    }

    #[test]
    fn width_sweep_stays_bounded() {
        // Each width step moves the slope without a corner.
        let ctx = Context::new(48000.0);
        let mut osc = MbTriangle::new(&ctx);
        osc.set_freq(220.0);
        for n in 0..48_000 {
            osc.set_width(-0.99 + 1.98 * n as f32 / 48_000.0);
            let y = osc.tick();
            assert!(y.abs() < 1.1, "n = {n}: {y}");
        }
    }
}
