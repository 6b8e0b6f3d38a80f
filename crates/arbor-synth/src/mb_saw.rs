//! Band-limited rising sawtooth with hard sync.

use arbor_core::Context;

use crate::minblep::{BlepBuffer, phase_increment, sanitize_sync};

/// Hard-syncable minBLEP sawtooth oscillator, output rising from -1 to 1.
///
/// A natural master for hard sync: its [`sync_out`](Self::sync_out) can be
/// fed straight into another oscillator's `sync_in`.
#[derive(Debug, Clone)]
pub struct MbSaw {
    buffer: BlepBuffer,
    phase: f32,
    inc: f32,
    freq: f32,
    sync_in: f32,
    sync_out: f32,
    inv_sample_rate: f32,
}

impl MbSaw {
    /// Create a 440 Hz sawtooth.
    pub fn new(ctx: &Context) -> Self {
        let mut osc = Self {
            buffer: BlepBuffer::new(),
            phase: 0.0,
            inc: 0.0,
            freq: 440.0,
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
        self.sync_in = 0.0;
        self.sync_out = 0.0;
    }

    /// Generate the next sample.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        let w = self.inc;
        let mut p = self.phase;
        let sync = core::mem::take(&mut self.sync_in);

        if sync > 0.0 {
            let offset = sync * w;
            let mut p_at_reset = p - offset;
            p = offset;
            if p_at_reset >= 1.0 {
                p_at_reset -= 1.0;
                self.buffer.place_step(p_at_reset + offset, w, 1.0);
            }
            // Naive value jumps from 0.5 - p_at_reset back up to 0.5.
            self.buffer.place_step(p, w, p_at_reset);
            self.sync_out = sync;
        } else if p >= 1.0 {
            p -= 1.0;
            self.sync_out = p / w + 1e-20;
            self.buffer.place_step(p, w, 1.0);
        } else {
            self.sync_out = 0.0;
        }

        let out = self.buffer.drain(0.5 - p, -w);
        self.phase = p + w;
        -2.0 * out
    }
}
