//! Pluggable uniform random sources.
//!
//! Noise generators take any [`RandomSource`]. The default is a
//! [`Xorshift32`] handed out by the [`Context`](crate::Context); tests can
//! substitute a closure or a fixed-seed generator for determinism.

/// Produces uniformly distributed samples in `[0, 1)`.
pub trait RandomSource {
    /// Next uniform sample in `[0, 1)`.
    fn next_uniform(&mut self) -> f32;
}

impl<F: FnMut() -> f32> RandomSource for F {
    #[inline]
    fn next_uniform(&mut self) -> f32 {
        self()
    }
}

/// Marsaglia xorshift32 generator.
///
/// Cheap, allocation-free, and good enough for audio noise. Not suitable for
/// anything cryptographic.
#[derive(Debug, Clone)]
pub struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    /// Create a generator from a seed. A zero seed (the one fixed point of
    /// xorshift) is replaced with a nonzero constant.
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 0x1234_5678 } else { seed },
        }
    }

    /// Next raw 32-bit value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Next sample in `[-1, 1)`.
    #[inline]
    pub fn next_bipolar(&mut self) -> f32 {
        self.next_uniform() * 2.0 - 1.0
    }
}

impl Default for Xorshift32 {
    fn default() -> Self {
        Self::new(0x1234_5678)
    }
}

impl RandomSource for Xorshift32 {
    #[inline]
    fn next_uniform(&mut self) -> f32 {
        // Top 24 bits fit exactly in an f32 mantissa.
        (self.next_u32() >> 8) as f32 * (1.0 / 16_777_216.0)
    }
}

/// SplitMix32-style scrambler used to derive independent seeds.
#[inline]
pub(crate) fn scramble_seed(mut z: u32) -> u32 {
    z = z.wrapping_add(0x9E37_79B9);
    z = (z ^ (z >> 16)).wrapping_mul(0x85EB_CA6B);
    z = (z ^ (z >> 13)).wrapping_mul(0xC2B2_AE35);
    z ^ (z >> 16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_range() {
        let mut rng = Xorshift32::new(42);
        for _ in 0..100_000 {
            let x = rng.next_uniform();
            assert!((0.0..1.0).contains(&x), "out of range: {x}");
        }
    }

    #[test]
    fn uniform_mean_near_half() {
        let mut rng = Xorshift32::new(7);
        let n = 100_000;
        let mean: f32 = (0..n).map(|_| rng.next_uniform()).sum::<f32>() / n as f32;
        assert!((mean - 0.5).abs() < 0.01, "mean {mean}");
    }

    #[test]
    fn zero_seed_is_not_stuck() {
        let mut rng = Xorshift32::new(0);
        assert_ne!(rng.next_u32(), 0);
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Xorshift32::new(99);
        let mut b = Xorshift32::new(99);
        for _ in 0..100 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn closures_are_sources() {
        let mut counter = 0.0f32;
        let mut source = move || {
            counter += 0.25;
            counter % 1.0
        };
        assert_eq!(source.next_uniform(), 0.25);
        assert_eq!(source.next_uniform(), 0.5);
    }

    #[test]
    fn scrambled_seeds_differ() {
        assert_ne!(scramble_seed(1), scramble_seed(2));
    }
}
