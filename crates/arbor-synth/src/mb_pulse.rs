//! Band-limited pulse oscillator with hard sync.
//!
//! Each rising and falling edge is corrected with a minBLEP step placed at
//! its exact sub-sample position (see [`crate::minblep`]). The oscillator can
//! be hard-synced to a master with sub-sample accuracy:
//!
//! ```rust
//! use arbor_core::Context;
//! use arbor_synth::{MbPulse, MbSaw};
//!
//! let ctx = Context::new(48000.0);
//! let mut master = MbSaw::new(&ctx);
//! let mut slave = MbPulse::new(&ctx);
//! master.set_freq(110.0);
//! slave.set_freq(370.0);
//!
//! for _ in 0..1024 {
//!     master.tick();
//!     slave.sync_in(master.sync_out());
//!     let y = slave.tick();
//!     assert!(y.abs() < 1.5);
//! }
//! ```

use arbor_core::Context;

use crate::minblep::{BlepBuffer, phase_increment, sanitize_sync};

/// Hard-syncable minBLEP pulse oscillator.
///
/// # Parameters
///
/// - `freq`: Hz; the per-sample increment is clamped to `[1e-5, 0.5]`
/// - `width`: duty cycle control in `[-1, 1]` (0 = square)
#[derive(Debug, Clone)]
pub struct MbPulse {
    buffer: BlepBuffer,
    phase: f32,
    inc: f32,
    freq: f32,
    width: f32,
    high: bool,
    sync_in: f32,
    sync_out: f32,
    inv_sample_rate: f32,
}

impl MbPulse {
    /// Create a 440 Hz square wave.
    pub fn new(ctx: &Context) -> Self {
        let mut osc = Self {
            buffer: BlepBuffer::new(),
            phase: 0.0,
            inc: 0.0,
            freq: 440.0,
            width: 0.0,
            high: true,
            sync_in: 0.0,
            sync_out: 0.0,
            inv_sample_rate: ctx.inv_sample_rate(),
        };
        osc.set_freq(440.0);
        osc
    }

    /// Set the frequency in Hz. Takes effect on the next phase advance.
    pub fn set_freq(&mut self, freq: f32) {
        self.freq = freq;
        self.inc = phase_increment(freq, self.inv_sample_rate);
    }

    /// Current frequency in Hz.
    pub fn freq(&self) -> f32 {
        self.freq
    }

    /// Set the duty cycle control, clamped to `[-1, 1]`.
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

    /// Hard-sync on the next tick. `offset` in `(0, 1]` is how many samples
    /// ago the master wrapped (as reported by its `sync_out`); 0 means none.
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
        self.high = true;
        self.sync_in = 0.0;
        self.sync_out = 0.0;
    }

    #[inline]
    fn rise(&mut self, since: f32, inc: f32) {
        self.buffer.place_step(since, inc, 1.0);
        self.high = true;
    }

    #[inline]
    fn fall(&mut self, since: f32, inc: f32) {
        self.buffer.place_step(since, inc, -1.0);
        self.high = false;
    }

    /// Generate the next sample.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        let w = self.inc;
        let b = (0.5 * (1.0 + self.width)).clamp(w, 1.0 - w);
        let mut p = self.phase;
        let sync = core::mem::take(&mut self.sync_in);

        if sync > 0.0 {
            let offset = sync * w;
            let mut p_at_reset = p - offset;
            p = offset;

            // Edges that fell inside this sample before the reset.
            if self.high {
                if p_at_reset >= b {
                    self.fall(p_at_reset - b + offset, w);
                }
                if p_at_reset >= 1.0 {
                    p_at_reset -= 1.0;
                    self.rise(p_at_reset + offset, w);
                }
            } else {
                if p_at_reset >= 1.0 {
                    p_at_reset -= 1.0;
                    self.rise(p_at_reset + offset, w);
                }
                if self.high && p_at_reset >= b {
                    self.fall(p_at_reset - b + offset, w);
                }
            }

            // The reset edge itself.
            if !self.high {
                self.rise(p, w);
            }
            if p >= b {
                self.fall(p - b, w);
            }
            self.sync_out = sync;
        } else if self.high {
            if p >= b {
                self.fall(p - b, w);
            }
            if p >= 1.0 {
                p -= 1.0;
                self.sync_out = p / w + 1e-20;
                self.rise(p, w);
            } else {
                self.sync_out = 0.0;
            }
        } else {
            if p >= 1.0 {
                p -= 1.0;
                self.sync_out = p / w + 1e-20;
                self.rise(p, w);
            } else {
                self.sync_out = 0.0;
            }
            if self.high && p >= b {
                self.fall(p - b, w);
            }
        }

        let naive = if self.high { 0.5 } else { -0.5 };
        let out = self.buffer.drain(naive, 0.0);
        self.phase = p + w;
        2.0 * out
    }
}
