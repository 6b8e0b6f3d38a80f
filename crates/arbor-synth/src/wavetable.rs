//! Table lookup oscillators.
//!
//! [`Table`] plays a caller-owned single-cycle table as-is. [`Wavetable`]
//! copies the table into the pool and derives a stack of progressively
//! lowpassed versions, one per octave, so it stays free of aliasing as the
//! frequency rises.

use arbor_core::{
    Butterworth, ButterworthType, Context, Filter, Mempool, PoolBuffer, PoolError, lerp,
};
use libm::{floorf, log2f};

use crate::phasor::wrap_phase;

/// Linearly interpolated read of a single-cycle table at `phase` in `[0, 1)`.
#[inline]
pub(crate) fn read_cycle(table: &[f32], phase: f32) -> f32 {
    let size = table.len();
    let pos = size as f32 * phase;
    let idx = (pos as usize).min(size - 1);
    let frac = pos - idx as f32;
    let next = if idx + 1 == size { 0 } else { idx + 1 };
    lerp(table[idx], table[next], frac)
}

/// Aliasing wavetable oscillator over a borrowed table.
///
/// An empty table produces silence.
#[derive(Debug, Clone)]
pub struct Table<'a> {
    table: &'a [f32],
    phase: f32,
    inc: f32,
    freq: f32,
    inv_sample_rate: f32,
}

impl<'a> Table<'a> {
    /// Create a 440 Hz oscillator reading `table`.
    pub fn new(ctx: &Context, table: &'a [f32]) -> Self {
        let mut osc = Self {
            table,
            phase: 0.0,
            inc: 0.0,
            freq: 0.0,
            inv_sample_rate: ctx.inv_sample_rate(),
        };
        osc.set_freq(440.0);
        osc
    }

    /// Advance and read the next sample.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        self.phase = wrap_phase(self.phase + self.inc);
        if self.table.is_empty() {
            return 0.0;
        }
        read_cycle(self.table, self.phase)
    }

    /// Set the frequency in Hz. Negative values wrap the phase backwards.
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

/// Anti-aliased wavetable oscillator.
///
/// Octave `n + 1` is octave `n` passed through an 8th-order Butterworth
/// lowpass at half the previous cutoff, starting from a quarter of the
/// sample rate. Playback picks the two octaves bracketing the current
/// frequency and crossfades between them.
///
/// # Example
///
/// ```rust
/// use arbor_core::Context;
/// use arbor_synth::Wavetable;
///
/// let ctx = Context::new(48000.0);
/// let saw: Vec<f32> = (0..512).map(|i| 2.0 * i as f32 / 512.0 - 1.0).collect();
/// let mut osc = Wavetable::new(&ctx, &saw, 12000.0).unwrap();
/// osc.set_freq(3000.0);
/// let y = osc.tick();
/// assert!(y.abs() < 1.5);
/// ```
#[derive(Debug)]
pub struct Wavetable {
    tables: PoolBuffer<f32>,
    size: usize,
    num_tables: usize,
    base_freq: f32,
    inv_base_freq: f32,
    phase: f32,
    inc: f32,
    freq: f32,
    oct: usize,
    w: f32,
    aa: f32,
    sample_rate: f32,
}

impl Wavetable {
    /// Octave offset applied to table selection by default.
    pub const DEFAULT_ANTI_ALIASING: f32 = 0.5;
    /// Upper bound on the number of octave tables.
    pub const MAX_TABLES: usize = 24;
    /// Filter passes per table; enough for the lowest cutoffs to settle.
    const SETTLE_PASSES: usize = 12;

    /// Build from `table`, with octaves up to `max_freq`, in the context pool.
    pub fn new(ctx: &Context, table: &[f32], max_freq: f32) -> Result<Self, PoolError> {
        Self::new_in(ctx, ctx.pool(), table, max_freq)
    }

    /// Build in a caller-supplied pool.
    pub fn new_in(
        ctx: &Context,
        pool: &Mempool,
        table: &[f32],
        max_freq: f32,
    ) -> Result<Self, PoolError> {
        let size = table.len();
        let sample_rate = ctx.sample_rate();
        let base_freq = sample_rate / size.max(1) as f32;

        let mut num_tables = 2;
        let mut f = base_freq;
        while f < max_freq && num_tables < Self::MAX_TABLES {
            num_tables += 1;
            f *= 2.0;
        }

        let mut tables = ctx.alloc::<f32>(pool, size * num_tables)?;
        tables[..size].copy_from_slice(table);

        let mut cutoff = sample_rate * 0.25;
        let mut lowpass = Butterworth::new(sample_rate, cutoff, 8, ButterworthType::Lowpass);
        for t in 1..num_tables {
            lowpass.set_freq(cutoff);
            let (done, rest) = tables.split_at_mut(t * size);
            let src = &done[(t - 1) * size..];
            let dst = &mut rest[..size];
            // Later passes overwrite earlier ones; the last holds the
            // periodic steady state.
            for _ in 0..Self::SETTLE_PASSES {
                for (out, &x) in dst.iter_mut().zip(src) {
                    *out = lowpass.tick(x);
                }
            }
            cutoff *= 0.5;
        }

        let mut osc = Self {
            tables,
            size,
            num_tables,
            base_freq,
            inv_base_freq: 1.0 / base_freq,
            phase: 0.0,
            inc: 0.0,
            freq: 0.0,
            oct: 0,
            w: 0.0,
            aa: Self::DEFAULT_ANTI_ALIASING,
            sample_rate,
        };
        osc.set_freq(220.0);
        Ok(osc)
    }

    #[inline]
    fn octave(&self, index: usize) -> &[f32] {
        &self.tables[index * self.size..(index + 1) * self.size]
    }

    /// Advance and read the next sample.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        self.phase = wrap_phase(self.phase + self.inc);
        let lower = read_cycle(self.octave(self.oct), self.phase);
        let upper = read_cycle(self.octave(self.oct + 1), self.phase);
        lerp(lower, upper, self.w)
    }

    /// Set the frequency in Hz and reselect the octave pair.
    pub fn set_freq(&mut self, freq: f32) {
        self.freq = freq;
        self.inc = freq / self.sample_rate;

        let mut w = log2f((freq * self.inv_base_freq).abs()) + self.aa;
        // Below the base frequency, or 0 Hz (log of zero)
        if w.is_nan() || w < 0.0 {
            w = 0.0;
        }
        let oct = floorf(w);
        if oct as usize >= self.num_tables - 1 {
            self.oct = self.num_tables - 2;
            self.w = 1.0;
        } else {
            self.oct = oct as usize;
            self.w = w - oct;
        }
    }

    /// Current frequency in Hz.
    pub fn freq(&self) -> f32 {
        self.freq
    }

    /// Shift table selection upward by `aa` octaves. Higher values trade
    /// high-frequency content for less aliasing; about 1 removes it.
    pub fn set_anti_aliasing(&mut self, aa: f32) {
        self.aa = aa;
        self.set_freq(self.freq);
    }

    /// Jump to a phase; wrapped into `[0, 1)`.
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = wrap_phase(phase);
    }

    /// Number of octave tables.
    pub fn num_tables(&self) -> usize {
        self.num_tables
    }

    /// Frequency at which one table sample is read per output sample.
    pub fn base_freq(&self) -> f32 {
        self.base_freq
    }

    /// Re-derive the base frequency and increment.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate > 0.0 {
            self.sample_rate = sample_rate;
            self.base_freq = sample_rate / self.size as f32;
            self.inv_base_freq = 1.0 / self.base_freq;
            self.set_freq(self.freq);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::TAU;
    use libm::{cosf, sinf, sqrtf};

    fn harmonic(table: &[f32], k: usize) -> f32 {
        let n = table.len() as f32;
        let (re, im) = table.iter().enumerate().fold((0.0, 0.0), |(re, im), (i, &x)| {
            let a = TAU * (k * i) as f32 / n;
            (re + x * cosf(a), im - x * sinf(a))
        });
        sqrtf(re * re + im * im)
    }

    fn square(size: usize) -> Vec<f32> {
        (0..size).map(|i| if i < size / 2 { 1.0 } else { -1.0 }).collect()
    }

    #[test]
    fn table_plays_at_requested_frequency() {
        let ctx = Context::new(48000.0);
        let sine: Vec<f32> = (0..1024).map(|i| sinf(TAU * i as f32 / 1024.0)).collect();
        let mut osc = Table::new(&ctx, &sine);
        osc.set_freq(500.0);
        let mut crossings = 0i32;
        let mut prev = 0.0;
        for _ in 0..48000 {
            let s = osc.tick();
            if prev <= 0.0 && s > 0.0 {
                crossings += 1;
            }
            prev = s;
        }
        assert!((crossings - 500).abs() <= 2, "crossings {crossings}");
    }

    #[test]
    fn empty_table_is_silent() {
        let ctx = Context::new(48000.0);
        let mut osc = Table::new(&ctx, &[]);
        assert_eq!(osc.tick(), 0.0);
    }

    #[test]
    fn higher_octaves_lose_upper_harmonics() {
        let ctx = Context::new(48000.0);
        let osc = Wavetable::new(&ctx, &square(256), 6000.0).unwrap();
        assert_eq!(osc.num_tables(), 7);
        let ratio = |t: usize| {
            let table = osc.octave(t);
            harmonic(table, 5) / harmonic(table, 1)
        };
        let full = ratio(0);
        assert!((full - 0.2).abs() < 0.01, "full {full}");
        assert!(ratio(5) < 0.5 * full, "octave 5 ratio {}", ratio(5));
    }

    #[test]
    fn octave_selection_follows_frequency() {
        let ctx = Context::new(48000.0);
        let mut osc = Wavetable::new(&ctx, &square(256), 12000.0).unwrap();
        osc.set_anti_aliasing(0.0);
        osc.set_freq(osc.base_freq() * 4.5);
        assert_eq!(osc.oct, 2);
        assert!((osc.w - 0.1699).abs() < 1e-3, "w {}", osc.w);
        osc.set_freq(0.0);
        assert_eq!(osc.oct, 0);
        osc.set_freq(1e9);
        assert_eq!(osc.oct, osc.num_tables() - 2);
    }

    #[test]
    fn tables_are_released_on_drop() {
        let ctx = Context::new(48000.0);
        {
            let _osc = Wavetable::new(&ctx, &square(512), 8000.0).unwrap();
            assert!(ctx.pool().used() > 0);
        }
        assert_eq!(ctx.pool().used(), 0);
    }

    #[test]
    fn empty_table_is_rejected() {
        let ctx = Context::new(48000.0);
        assert!(matches!(
            Wavetable::new(&ctx, &[], 1000.0),
            Err(PoolError::ZeroSized)
        ));
    }
}
