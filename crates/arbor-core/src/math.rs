//! Scalar helpers shared by the oscillators and detectors.
//!
//! Two level scales are in use: ordinary dBFS ([`db_to_linear`],
//! [`linear_to_db`]) and the Pd scale, where unit power reads 100 dB and
//! silence reads 0 ([`pow_to_db`], [`rms_to_db`]). The envelope estimator
//! reports on the second.

use libm::{expf, logf, powf};

/// dBFS to amplitude ratio.
///
/// # Example
/// ```rust
/// use arbor_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Amplitude ratio to dBFS, floored at -200 dB.
///
/// # Example
/// ```rust
/// use arbor_core::linear_to_db;
///
/// assert!((linear_to_db(1.0) - 0.0).abs() < 0.001);
/// assert!((linear_to_db(0.5) - (-6.02)).abs() < 0.01);
/// ```
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Convert a power (mean-square) value to the Pd level scale.
///
/// Unity power maps to 100 dB; every factor of 10 in power is 10 dB. The
/// result is clamped at 0 dB, so anything at or below 1e-10 power reads 0.
#[inline]
pub fn pow_to_db(power: f32) -> f32 {
    const FACTOR: f32 = 10.0 / core::f32::consts::LN_10;
    if power <= 0.0 {
        return 0.0;
    }
    (100.0 + logf(power) * FACTOR).max(0.0)
}

/// Convert an RMS amplitude to the Pd level scale (see [`pow_to_db`]).
#[inline]
pub fn rms_to_db(rms: f32) -> f32 {
    pow_to_db(rms * rms)
}

/// `a` at `t = 0`, `b` at `t = 1`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Limit `x` to `[min, max]`.
///
/// Unlike [`f32::clamp`] this never panics when `min > max`; `min` wins.
#[inline]
pub fn clamp(x: f32, min: f32, max: f32) -> f32 {
    if x > max {
        if max < min { min } else { max }
    } else if x < min {
        min
    } else {
        x
    }
}

/// Milliseconds to a (fractional) sample count.
#[inline]
pub fn ms_to_samples(ms: f32, sample_rate: f32) -> f32 {
    ms * sample_rate / 1000.0
}

/// Per-sample multiplier that decays to `target` (e.g. 0.01 = -40 dB) after
/// `time_ms` milliseconds.
///
/// ```text
/// coeff = target ^ (1 / (time_ms * sample_rate / 1000))
/// ```
///
/// Times below one sample return 0.0 (instant response).
#[inline]
pub fn decay_coeff(time_ms: f32, sample_rate: f32, target: f32) -> f32 {
    let samples = ms_to_samples(time_ms, sample_rate);
    if samples < 1.0 {
        return 0.0;
    }
    powf(target, 1.0 / samples)
}

/// Zero anything smaller in magnitude than 1e-20.
///
/// Applied to the state of decaying followers and filters, which would
/// otherwise drift into the subnormal range on silent input.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dbfs_reference_points() {
        assert!((linear_to_db(0.5) + 6.0206).abs() < 1e-3);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
        assert!((db_to_linear(linear_to_db(0.25)) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(lerp(2.0, 6.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 6.0, 1.0), 6.0);
        assert_eq!(lerp(2.0, 6.0, 0.25), 3.0);
    }

    #[test]
    fn test_linear_to_db_silence_is_finite() {
        assert!(linear_to_db(0.0).is_finite());
        assert!((linear_to_db(0.0) + 200.0).abs() < 0.01);
    }

    #[test]
    fn test_pow_to_db_scale() {
        assert!((pow_to_db(1.0) - 100.0).abs() < 1e-4);
        assert!((pow_to_db(0.1) - 90.0).abs() < 1e-3);
        assert_eq!(pow_to_db(0.0), 0.0);
        assert_eq!(pow_to_db(1e-12), 0.0);
        assert!((rms_to_db(0.1) - 80.0).abs() < 1e-3);
    }

    #[test]
    fn test_clamp_inverted_range() {
        assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.5, 1.0, 0.0), 1.0);
    }

    #[test]
    fn test_decay_coeff_reaches_target() {
        let sr = 48000.0;
        let coeff = decay_coeff(10.0, sr, 0.01);
        let samples = ms_to_samples(10.0, sr) as i32;
        let reached = powf(coeff, samples as f32);
        assert!((reached - 0.01).abs() < 1e-3, "reached {reached}");
        assert_eq!(decay_coeff(0.0, sr, 0.01), 0.0);
    }

    #[test]
    fn test_flush_small_values() {
        assert_eq!(flush_denormal(1e-25), 0.0);
        assert_eq!(flush_denormal(-1e-25), 0.0);
        assert_eq!(flush_denormal(0.5), 0.5);
    }
}
