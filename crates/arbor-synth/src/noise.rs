//! White and pink noise.
//!
//! Pink noise is white noise through Paul Kellet's "economy" filter: three
//! one-pole lowpasses in parallel plus a direct path, within about 0.05 dB
//! of a -3 dB/octave slope above 9 Hz at 44.1 kHz.

use arbor_core::{Context, RandomSource, Xorshift32};

/// Spectral colour of a [`Noise`] generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseType {
    /// Flat spectrum, uniform in `[-1, 1)`.
    #[default]
    White,
    /// -3 dB/octave spectrum.
    Pink,
}

// Kellet economy filter: (pole, input gain) per branch.
const PINK_BRANCHES: [(f32, f32); 3] = [
    (0.99765, 0.099_046),
    (0.963, 0.296_516_4),
    (0.57, 1.052_691_3),
];
const PINK_DIRECT: f32 = 0.1848;
const PINK_GAIN: f32 = 0.05;

/// Noise generator over an injectable [`RandomSource`].
///
/// ```rust
/// use arbor_core::Context;
/// use arbor_synth::{Noise, NoiseType};
///
/// let ctx = Context::new(48000.0);
/// let mut hiss = Noise::new(&ctx, NoiseType::Pink);
/// let block: Vec<f32> = (0..256).map(|_| hiss.tick()).collect();
/// assert!(block.iter().all(|x| x.is_finite()));
///
/// // Any closure returning values in [0, 1) can drive it.
/// let mut steady = Noise::with_source(NoiseType::White, || 0.75f32);
/// assert_eq!(steady.tick(), 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct Noise<R: RandomSource = Xorshift32> {
    kind: NoiseType,
    pink: [f32; 3],
    source: R,
}

impl Noise<Xorshift32> {
    /// Create a generator seeded from the context's random stream.
    pub fn new(ctx: &Context, kind: NoiseType) -> Self {
        Self::with_source(kind, ctx.random_source())
    }
}

impl<R: RandomSource> Noise<R> {
    /// Create a generator drawing from `source`.
    pub fn with_source(kind: NoiseType, source: R) -> Self {
        Self {
            kind,
            pink: [0.0; 3],
            source,
        }
    }

    /// Noise colour.
    pub fn kind(&self) -> NoiseType {
        self.kind
    }

    /// Switch colour; the pink filter restarts from rest.
    pub fn set_kind(&mut self, kind: NoiseType) {
        self.kind = kind;
        self.pink = [0.0; 3];
    }

    /// Generate the next sample.
    #[inline]
    pub fn tick(&mut self) -> f32 {
        let white = 2.0 * self.source.next_uniform() - 1.0;
        match self.kind {
            NoiseType::White => white,
            NoiseType::Pink => {
                let mut sum = white * PINK_DIRECT;
                for (state, &(pole, gain)) in self.pink.iter_mut().zip(&PINK_BRANCHES) {
                    *state = pole * *state + white * gain;
                    sum += *state;
                }
                sum * PINK_GAIN
            }
        }
    }
}
