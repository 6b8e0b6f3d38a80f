//! Sample-by-sample level trackers.
//!
//! - [`EnvelopeFollower`] rides amplitude peaks and decays exponentially
//!   between them.
//! - [`PowerFollower`] is a one-pole smoother of the squared input.

use arbor_core::{ParamError, flush_denormal};

/// Peak-riding amplitude follower.
///
/// A sample whose magnitude is at least the current envelope *and* above the
/// attack threshold snaps the envelope to it; otherwise the envelope is
/// multiplied by the decay coefficient.
///
/// # Example
///
/// ```rust
/// use arbor_analysis::EnvelopeFollower;
///
/// let mut env = EnvelopeFollower::new(0.1, 0.99);
/// assert_eq!(env.tick(-0.8), 0.8);
/// assert!((env.tick(0.0) - 0.792).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeFollower {
    y: f32,
    attack_threshold: f32,
    decay_coeff: f32,
}

impl EnvelopeFollower {
    /// Create a follower. Both arguments are clamped to `[0, 1]`.
    pub fn new(attack_threshold: f32, decay_coeff: f32) -> Self {
        Self {
            y: 0.0,
            attack_threshold: sanitize_unit(attack_threshold),
            decay_coeff: sanitize_unit(decay_coeff),
        }
    }

    /// Feed one sample; returns the envelope. NaN input returns 0 and leaves
    /// the envelope untouched.
    #[inline]
    pub fn tick(&mut self, x: f32) -> f32 {
        if x.is_nan() {
            return 0.0;
        }
        let x = x.abs();
        if x >= self.y && x > self.attack_threshold {
            self.y = x;
        } else {
            self.y = flush_denormal(self.y * self.decay_coeff);
        }
        self.y
    }

    /// Current envelope value.
    pub fn value(&self) -> f32 {
        self.y
    }

    /// Per-sample decay multiplier. Values outside `[0, 1]` are rejected.
    pub fn set_decay_coeff(&mut self, decay_coeff: f32) -> Result<(), ParamError> {
        self.decay_coeff = ParamError::check_unit("decay coefficient", decay_coeff)?;
        Ok(())
    }

    /// Minimum magnitude that can start a new peak. Values outside `[0, 1]`
    /// are rejected.
    pub fn set_attack_threshold(&mut self, attack_threshold: f32) -> Result<(), ParamError> {
        self.attack_threshold = ParamError::check_unit("attack threshold", attack_threshold)?;
        Ok(())
    }

    /// Drop the envelope to zero.
    pub fn reset(&mut self) {
        self.y = 0.0;
    }
}

/// One-pole power smoother: `p = f * x^2 + (1 - f) * p`.
#[derive(Debug, Clone)]
pub struct PowerFollower {
    factor: f32,
    one_minus_factor: f32,
    current: f32,
}

impl PowerFollower {
    /// Create a follower with smoothing factor `factor` (clamped to `[0, 1]`).
    pub fn new(factor: f32) -> Self {
        let mut follower = Self {
            factor: 0.0,
            one_minus_factor: 1.0,
            current: 0.0,
        };
        follower.set_factor(factor);
        follower
    }

    /// Feed one sample; returns the smoothed power.
    #[inline]
    pub fn tick(&mut self, x: f32) -> f32 {
        self.current = flush_denormal(self.factor * x * x + self.one_minus_factor * self.current);
        self.current
    }

    /// Last smoothed power, without advancing.
    pub fn sample(&self) -> f32 {
        self.current
    }

    /// Smoothing factor; 1 tracks instantly, 0 freezes.
    pub fn set_factor(&mut self, factor: f32) {
        let factor = sanitize_unit(factor);

        #[cfg(feature = "tracing")]
        if factor == 0.0 {
            tracing::warn!("power follower: factor 0 freezes the output");
        }

        self.factor = factor;
        self.one_minus_factor = 1.0 - factor;
    }

    /// Drop the power estimate to zero.
    pub fn reset(&mut self) {
        self.current = 0.0;
    }
}

fn sanitize_unit(x: f32) -> f32 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follower_rides_peaks_and_decays() {
        let mut env = EnvelopeFollower::new(0.05, 0.5);
        assert_eq!(env.tick(0.6), 0.6);
        assert_eq!(env.tick(0.2), 0.3);
        assert_eq!(env.tick(-0.9), 0.9);
        assert_eq!(env.tick(0.0), 0.45);
    }

    #[test]
    fn below_threshold_never_attacks() {
        let mut env = EnvelopeFollower::new(0.5, 0.9);
        for _ in 0..100 {
            assert_eq!(env.tick(0.4), 0.0);
        }
    }

    #[test]
    fn decay_reaches_exact_zero() {
        let mut env = EnvelopeFollower::new(0.0, 0.5);
        env.tick(1.0);
        for _ in 0..200 {
            env.tick(0.0);
        }
        assert_eq!(env.value(), 0.0);
    }

    #[test]
    fn rejected_setters_keep_previous_values() {
        let mut env = EnvelopeFollower::new(0.1, 0.5);
        assert!(env.set_decay_coeff(1.5).is_err());
        assert!(env.set_attack_threshold(-0.1).is_err());
        assert!(env.set_decay_coeff(f32::NAN).is_err());
        env.tick(1.0);
        assert_eq!(env.tick(0.0), 0.5);
        assert_eq!(env.tick(0.05), 0.25);

        assert!(env.set_decay_coeff(0.25).is_ok());
        assert_eq!(env.tick(0.0), 0.0625);
    }

    #[test]
    fn nan_input_is_ignored() {
        let mut env = EnvelopeFollower::new(0.0, 0.9);
        env.tick(0.5);
        assert_eq!(env.tick(f32::NAN), 0.0);
        assert_eq!(env.value(), 0.5);
    }

    #[test]
    fn power_follower_converges_to_mean_square() {
        let mut power = PowerFollower::new(0.01);
        for n in 0..20000 {
            power.tick(if n % 2 == 0 { 0.5 } else { -0.5 });
        }
        assert!((power.sample() - 0.25).abs() < 1e-3);
    }

    #[test]
    fn power_factor_is_clamped() {
        let mut power = PowerFollower::new(3.0);
        assert_eq!(power.tick(2.0), 4.0);
        power.set_factor(-1.0);
        assert_eq!(power.tick(5.0), 4.0);
    }
}
