//! Error types shared across arbor crates.
//!
//! Real-time paths never return errors. Failures are limited to
//! construction (pool exhaustion) and to the few setters that reject a value
//! instead of clamping it.

use thiserror::Error;

/// Errors returned when reserving memory from a [`Mempool`](crate::Mempool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The pool does not have enough free bytes for the request.
    #[error("mempool exhausted: requested {requested} bytes, {available} available")]
    Exhausted {
        /// Bytes requested by the allocation.
        requested: usize,
        /// Bytes still free in the pool at the time of the request.
        available: usize,
    },

    /// A zero-length reservation was requested.
    #[error("zero-sized mempool allocation")]
    ZeroSized,
}

/// Errors returned by parameter setters that reject out-of-range values.
///
/// The component's previous value is left unchanged when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ParamError {
    /// The value lies outside the accepted range.
    #[error("{name} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f32,
        /// Inclusive lower bound.
        min: f32,
        /// Inclusive upper bound.
        max: f32,
    },
}

impl ParamError {
    /// Check `value` against the unit interval `[0, 1]`.
    pub fn check_unit(name: &'static str, value: f32) -> Result<f32, Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(Self::OutOfRange {
                name,
                value,
                min: 0.0,
                max: 1.0,
            })
        }
    }
}
