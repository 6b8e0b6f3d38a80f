//! Block-based transient detector.
//!
//! Each call to [`AttackDetection::detect`] runs an attack/release
//! follower over one block of `|x|` and compares the envelope at the end of
//! the block with the one at the end of the previous block. A rise of at
//! least the threshold (in dB) from a level above the silence floor counts
//! as an attack, located at the sample where the envelope climbed the most.

use arbor_core::{Context, db_to_linear, decay_coeff};

/// Default samples examined per call.
pub const DEF_BLOCK_SIZE: usize = 1024;
/// Default rise, in dB, that counts as an attack.
pub const DEF_THRESHOLD: f32 = 6.0;
/// Default follower attack time in ms.
pub const DEF_ATTACK: f32 = 10.0;
/// Default follower release time in ms.
pub const DEF_RELEASE: f32 = 10.0;
/// Envelope level a block must end above to count as an attack (-60 dBFS).
pub const SILENCE_FLOOR: f32 = 0.001;

/// Level the follower coefficients converge to within their time (-40 dB).
const COEFF_TARGET: f32 = 0.01;

/// Transient detector over fixed-size blocks.
///
/// # Example
///
/// ```rust
/// use arbor_analysis::AttackDetection;
/// use arbor_core::Context;
///
/// let ctx = Context::new(48000.0);
/// let mut detector = AttackDetection::new(&ctx, 512);
///
/// assert_eq!(detector.detect(&[0.0; 512]), None);
///
/// let mut hit = [0.0f32; 512];
/// hit[200..].fill(0.7);
/// assert_eq!(detector.detect(&hit), Some(200));
/// ```
#[derive(Debug, Clone)]
pub struct AttackDetection {
    env: f32,
    prev_amp: f32,
    attack_ms: f32,
    release_ms: f32,
    attack_coeff: f32,
    release_coeff: f32,
    block_size: usize,
    sample_rate: f32,
    threshold_db: f32,
    ratio: f32,
}

impl AttackDetection {
    /// Detector with the default 10 ms attack and release.
    pub fn new(ctx: &Context, block_size: usize) -> Self {
        Self::with_times(ctx, block_size, DEF_ATTACK, DEF_RELEASE)
    }

    /// Detector with explicit follower times in ms.
    pub fn with_times(ctx: &Context, block_size: usize, attack_ms: f32, release_ms: f32) -> Self {
        let mut detector = Self {
            env: 0.0,
            prev_amp: 0.0,
            attack_ms: 0.0,
            release_ms: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            block_size: block_size.max(1),
            sample_rate: ctx.sample_rate(),
            threshold_db: 0.0,
            ratio: 1.0,
        };
        detector.set_attack(attack_ms);
        detector.set_release(release_ms);
        detector.set_threshold(DEF_THRESHOLD);
        detector
    }

    /// Run one block; returns the attack position within it, if any.
    ///
    /// Only the first `block_size` samples of `input` are examined.
    pub fn detect(&mut self, input: &[f32]) -> Option<usize> {
        let mut env = self.env;
        let mut steepest = None;
        let mut steepest_rise = 0.0f32;

        for (n, &x) in input.iter().take(self.block_size).enumerate() {
            let x = if x.is_finite() { x.abs() } else { 0.0 };
            let coeff = if x > env {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            let next = coeff * (env - x) + x;
            let rise = next - env;
            if rise > steepest_rise {
                steepest_rise = rise;
                steepest = Some(n);
            }
            env = next;
        }

        self.env = env;
        let attack = env > SILENCE_FLOOR && env >= self.prev_amp * self.ratio;
        self.prev_amp = env;
        if attack { steepest } else { None }
    }

    /// Envelope at the end of the last block.
    pub fn envelope(&self) -> f32 {
        self.env
    }

    /// Samples examined per call; zero is raised to one.
    pub fn set_block_size(&mut self, block_size: usize) {
        self.block_size = block_size.max(1);
    }

    /// Samples examined per call.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Re-derive the follower coefficients for a new rate. Non-positive
    /// rates are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate.is_finite() && sample_rate > 0.0 {
            self.sample_rate = sample_rate;
            self.set_attack(self.attack_ms);
            self.set_release(self.release_ms);
        }
    }

    /// Follower attack time in ms; times under one sample respond instantly.
    pub fn set_attack(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms.max(0.0);
        self.attack_coeff = decay_coeff(self.attack_ms, self.sample_rate, COEFF_TARGET);
    }

    /// Follower release time in ms.
    pub fn set_release(&mut self, release_ms: f32) {
        self.release_ms = release_ms.max(0.0);
        self.release_coeff = decay_coeff(self.release_ms, self.sample_rate, COEFF_TARGET);
    }

    /// Rise in dB between block-end envelopes that counts as an attack.
    /// Negative values are treated as 0 dB.
    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.threshold_db = threshold_db.max(0.0);
        self.ratio = db_to_linear(self.threshold_db);
    }

    /// Attack threshold in dB.
    pub fn threshold(&self) -> f32 {
        self.threshold_db
    }

    /// Forget the envelope history.
    pub fn reset(&mut self) {
        self.env = 0.0;
        self.prev_amp = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::new(48000.0)
    }

    #[test]
    fn silence_never_triggers() {
        let mut detector = AttackDetection::new(&ctx(), DEF_BLOCK_SIZE);
        for _ in 0..8 {
            assert_eq!(detector.detect(&[0.0; DEF_BLOCK_SIZE]), None);
        }
    }

    #[test]
    fn step_is_located_at_its_first_sample() {
        let mut detector = AttackDetection::new(&ctx(), DEF_BLOCK_SIZE);
        assert_eq!(detector.detect(&[0.0; DEF_BLOCK_SIZE]), None);

        let mut block = [0.0f32; DEF_BLOCK_SIZE];
        block[300..].fill(0.5);
        assert_eq!(detector.detect(&block), Some(300));

        // The sustained level is not a new attack.
        assert_eq!(detector.detect(&[0.5; DEF_BLOCK_SIZE]), None);
    }

    #[test]
    fn threshold_sets_required_rise() {
        let quiet = [0.1f32; DEF_BLOCK_SIZE];
        let loud = [0.5f32; DEF_BLOCK_SIZE];

        let mut detector = AttackDetection::new(&ctx(), DEF_BLOCK_SIZE);
        for _ in 0..4 {
            detector.detect(&quiet);
        }
        assert_eq!(detector.detect(&loud), Some(0));

        let mut strict = AttackDetection::new(&ctx(), DEF_BLOCK_SIZE);
        strict.set_threshold(20.0);
        for _ in 0..4 {
            strict.detect(&quiet);
        }
        assert_eq!(strict.detect(&loud), None);
    }

    #[test]
    fn below_silence_floor_is_ignored() {
        let mut detector = AttackDetection::new(&ctx(), 256);
        detector.detect(&[0.0; 256]);
        assert_eq!(detector.detect(&[0.0005; 256]), None);
    }

    #[test]
    fn only_block_size_samples_are_read() {
        let mut detector = AttackDetection::new(&ctx(), 128);
        let mut block = [0.0f32; 512];
        block[256..].fill(1.0);
        assert_eq!(detector.detect(&block), None);
        assert_eq!(detector.envelope(), 0.0);
    }

    #[test]
    fn instant_times_track_input() {
        let mut detector = AttackDetection::with_times(&ctx(), 64, 0.0, 0.0);
        detector.detect(&[0.25; 64]);
        assert_eq!(detector.envelope(), 0.25);
        detector.set_sample_rate(96000.0);
        detector.detect(&[0.0; 64]);
        assert_eq!(detector.envelope(), 0.0);
    }
}
