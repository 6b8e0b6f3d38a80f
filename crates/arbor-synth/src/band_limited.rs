//! Band-limited classic waveforms from per-octave additive tables.
//!
//! Each oscillator builds [`NUM_TABLES`] single-cycle tables of
//! [`TABLE_SIZE`] samples at construction. Table `o` holds only the
//! harmonics that stay below Nyquist for every frequency it serves, so
//! playback never aliases. Between octaves the two neighbouring tables are
//! crossfaded.

use arbor_core::{Context, Mempool, PoolBuffer, PoolError, lerp};
use core::f32::consts::{PI, TAU};
use libm::{floorf, log2f, sinf};

use crate::phasor::wrap_phase;
use crate::wavetable::read_cycle;

/// Samples per table.
pub const TABLE_SIZE: usize = 2048;
/// Octave tables per oscillator.
pub const NUM_TABLES: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Triangle,
    Square,
    Sawtooth,
}

impl Shape {
    /// Fourier sine coefficient of harmonic `h` (0 for absent harmonics).
    fn coefficient(self, h: usize) -> f32 {
        let hf = h as f32;
        match self {
            Shape::Triangle if h % 2 == 1 => {
                let sign = if (h / 2) % 2 == 0 { 1.0 } else { -1.0 };
                sign * 8.0 / (PI * PI * hf * hf)
            }
            Shape::Square if h % 2 == 1 => 4.0 / (PI * hf),
            Shape::Sawtooth => -2.0 / (PI * hf),
            _ => 0.0,
        }
    }
}

/// Highest harmonic table `octave` may contain.
fn max_harmonic(octave: usize) -> usize {
    (TABLE_SIZE >> (octave + 2)).max(1)
}

#[derive(Debug)]
struct BandLimited {
    tables: PoolBuffer<f32>,
    phase: f32,
    inc: f32,
    freq: f32,
    oct: usize,
    w: f32,
    inv_sample_rate: f32,
}

impl BandLimited {
    fn new_in(ctx: &Context, pool: &Mempool, shape: Shape) -> Result<Self, PoolError> {
        let mut tables = ctx.alloc::<f32>(pool, TABLE_SIZE * NUM_TABLES)?;
        {
            // Scratch sine cycle; harmonic h at sample i reads index h*i mod N.
            let mut sine = ctx.alloc::<f32>(pool, TABLE_SIZE)?;
            for (i, s) in sine.iter_mut().enumerate() {
                *s = sinf(TAU * i as f32 / TABLE_SIZE as f32);
            }
            for (octave, table) in tables.chunks_exact_mut(TABLE_SIZE).enumerate() {
                for h in 1..=max_harmonic(octave) {
                    let amp = shape.coefficient(h);
                    if amp == 0.0 {
                        continue;
                    }
                    for (i, out) in table.iter_mut().enumerate() {
                        *out += amp * sine[(h * i) % TABLE_SIZE];
                    }
                }
            }
        }

        let mut osc = Self {
            tables,
            phase: 0.0,
            inc: 0.0,
            freq: 0.0,
            oct: 0,
            w: 0.0,
            inv_sample_rate: ctx.inv_sample_rate(),
        };
        osc.set_freq(440.0);
        Ok(osc)
    }

    #[inline]
    fn octave(&self, index: usize) -> &[f32] {
        &self.tables[index * TABLE_SIZE..(index + 1) * TABLE_SIZE]
    }

    #[inline]
    fn tick(&mut self) -> f32 {
        self.phase = wrap_phase(self.phase + self.inc);
        let lower = read_cycle(self.octave(self.oct), self.phase);
        let upper = read_cycle(self.octave(self.oct + 1), self.phase);
        lerp(lower, upper, self.w)
    }

    fn set_freq(&mut self, freq: f32) {
        self.freq = freq;
        self.inc = freq * self.inv_sample_rate;

        let mut w = log2f((freq * TABLE_SIZE as f32 * self.inv_sample_rate).abs());
        if w.is_nan() || w < 0.0 {
            w = 0.0;
        }
        let oct = floorf(w);
        if oct as usize >= NUM_TABLES - 1 {
            self.oct = NUM_TABLES - 2;
            self.w = 1.0;
        } else {
            self.oct = oct as usize;
            self.w = w - oct;
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate > 0.0 {
            self.inv_sample_rate = 1.0 / sample_rate;
            self.set_freq(self.freq);
        }
    }
}

macro_rules! band_limited_oscillator {
    ($(#[$doc:meta])* $name:ident, $shape:expr) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name {
            inner: BandLimited,
        }

        impl $name {
            /// Create a 440 Hz oscillator with tables in the context pool.
            pub fn new(ctx: &Context) -> Result<Self, PoolError> {
                Self::new_in(ctx, ctx.pool())
            }

            /// Create with tables in a caller-supplied pool.
            pub fn new_in(ctx: &Context, pool: &Mempool) -> Result<Self, PoolError> {
                Ok(Self { inner: BandLimited::new_in(ctx, pool, $shape)? })
            }

            /// Advance and read the next sample.
            #[inline]
            pub fn tick(&mut self) -> f32 {
                self.inner.tick()
            }

            /// Set the frequency in Hz and reselect the octave pair.
            pub fn set_freq(&mut self, freq: f32) {
                self.inner.set_freq(freq);
            }

            /// Current frequency in Hz.
            pub fn freq(&self) -> f32 {
                self.inner.freq
            }

            /// Jump to a phase; wrapped into `[0, 1)`.
            pub fn set_phase(&mut self, phase: f32) {
                self.inner.phase = wrap_phase(phase);
            }

            /// Re-derive the increment from the stored frequency.
            pub fn set_sample_rate(&mut self, sample_rate: f32) {
                self.inner.set_sample_rate(sample_rate);
            }
        }
    };
}

band_limited_oscillator!(
    /// Band-limited triangle, starting at 0 and rising.
    Triangle,
    Shape::Triangle
);
band_limited_oscillator!(
    /// Band-limited square, high for the first half cycle.
    Square,
    Shape::Square
);
band_limited_oscillator!(
    /// Band-limited sawtooth, rising from -1 to 1.
    Sawtooth,
    Shape::Sawtooth
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harmonic_budget_halves_per_octave() {
        assert_eq!(max_harmonic(0), 512);
        assert_eq!(max_harmonic(1), 256);
        assert_eq!(max_harmonic(9), 1);
        assert_eq!(max_harmonic(10), 1);
    }

    #[test]
    fn square_table_levels() {
        let ctx = Context::new(48000.0);
        let osc = Square::new(&ctx).unwrap();
        let table = osc.inner.octave(0);
        // Away from the edges the partial sum sits near +-1.
        assert!((table[TABLE_SIZE / 4] - 1.0).abs() < 0.01);
        assert!((table[3 * TABLE_SIZE / 4] + 1.0).abs() < 0.01);
    }

    #[test]
    fn triangle_peaks_at_quarter_cycle() {
        let ctx = Context::new(48000.0);
        let osc = Triangle::new(&ctx).unwrap();
        let table = osc.inner.octave(0);
        assert!((table[TABLE_SIZE / 4] - 1.0).abs() < 0.01);
        assert!(table[0].abs() < 1e-3);
    }

    #[test]
    fn top_octave_is_a_sine() {
        let ctx = Context::new(48000.0);
        let osc = Sawtooth::new(&ctx).unwrap();
        let top = osc.inner.octave(NUM_TABLES - 1);
        let amp = 2.0 / PI;
        for i in (0..TABLE_SIZE).step_by(97) {
            let expected = -amp * sinf(TAU * i as f32 / TABLE_SIZE as f32);
            assert!((top[i] - expected).abs() < 1e-4, "i = {i}");
        }
    }

    #[test]
    fn scratch_memory_is_returned() {
        let ctx = Context::new(48000.0);
        let _osc = Sawtooth::new(&ctx).unwrap();
        let table_bytes = TABLE_SIZE * NUM_TABLES * core::mem::size_of::<f32>();
        assert_eq!(ctx.pool().used(), table_bytes);
        assert!(ctx.pool().peak() > table_bytes);
    }

    #[test]
    fn sawtooth_frequency() {
        let ctx = Context::new(48000.0);
        let mut osc = Sawtooth::new(&ctx).unwrap();
        osc.set_freq(1000.0);
        let mut rising = 0i32;
        let mut prev = osc.tick();
        for _ in 0..48000 {
            let s = osc.tick();
            if prev < 0.0 && s >= 0.0 {
                rising += 1;
            }
            prev = s;
        }
        assert!((rising - 1000).abs() <= 2, "rising crossings {rising}");
    }
}
