//! Parameter validation.
//!
//! Checks are collected rather than short-circuited: a configuration with
//! three bad values reports all three, wrapped in
//! [`ValidationError::Multiple`]. A single failure is returned unwrapped.
//!
//! # Example
//!
//! ```rust
//! use arbor_config::{Validator, ValidationError};
//!
//! let mut v = Validator::new();
//! v.range("snac.bias", 0.4, 0.0, 1.0);
//! v.power_of_two("snac.overlap", 3, 1, 32);
//! assert!(matches!(v.finish(), Err(ValidationError::NotPowerOfTwo { .. })));
//! ```

use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Real-valued parameter out of range (or not finite).
    #[error("parameter '{param}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted parameter path, e.g. `period.pitch_ratio`.
        param: String,
        /// The rejected value.
        value: f32,
        /// Minimum allowed value.
        min: f32,
        /// Maximum allowed value.
        max: f32,
    },

    /// Count parameter out of range.
    #[error("parameter '{param}' value {value} out of range [{min}, {max}]")]
    CountOutOfRange {
        /// Dotted parameter path.
        param: String,
        /// The rejected value.
        value: usize,
        /// Minimum allowed value.
        min: usize,
        /// Maximum allowed value.
        max: usize,
    },

    /// Value must be a power of two.
    #[error("parameter '{param}' value {value} is not a power of two")]
    NotPowerOfTwo {
        /// Dotted parameter path.
        param: String,
        /// The rejected value.
        value: usize,
    },

    /// Two parameters disagree with each other.
    #[error("parameter '{param}': {reason}")]
    Inconsistent {
        /// Dotted parameter path of the dependent value.
        param: String,
        /// What the value must satisfy.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Number of individual failures this error stands for.
    pub fn count(&self) -> usize {
        match self {
            ValidationError::Multiple(errors) => errors.len(),
            _ => 1,
        }
    }

    /// Flattened list of individual failures.
    pub fn errors(&self) -> Vec<&ValidationError> {
        match self {
            ValidationError::Multiple(errors) => errors.iter().collect(),
            single => vec![single],
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Collects validation failures across a whole configuration.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationError>,
}

impl Validator {
    /// Create an empty validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// `value` must be finite and within `[min, max]`.
    pub fn range(&mut self, param: &str, value: f32, min: f32, max: f32) {
        if !(value.is_finite() && value >= min && value <= max) {
            self.errors.push(ValidationError::OutOfRange {
                param: param.to_string(),
                value,
                min,
                max,
            });
        }
    }

    /// `value` must be finite and at least `min`.
    pub fn at_least(&mut self, param: &str, value: f32, min: f32) {
        self.range(param, value, min, f32::MAX);
    }

    /// `value` must be within `[min, max]`.
    pub fn count(&mut self, param: &str, value: usize, min: usize, max: usize) {
        if value < min || value > max {
            self.errors.push(ValidationError::CountOutOfRange {
                param: param.to_string(),
                value,
                min,
                max,
            });
        }
    }

    /// `value` must be a power of two within `[min, max]`.
    pub fn power_of_two(&mut self, param: &str, value: usize, min: usize, max: usize) {
        if !value.is_power_of_two() {
            self.errors.push(ValidationError::NotPowerOfTwo {
                param: param.to_string(),
                value,
            });
        } else {
            self.count(param, value, min, max);
        }
    }

    /// Record `reason` against `param` unless `ok` holds.
    pub fn require(&mut self, ok: bool, param: &str, reason: impl Into<String>) {
        if !ok {
            self.errors.push(ValidationError::Inconsistent {
                param: param.to_string(),
                reason: reason.into(),
            });
        }
    }

    /// Whether nothing has failed so far.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Consume the validator.
    pub fn finish(mut self) -> ValidationResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.swap_remove(0)),
            _ => Err(ValidationError::Multiple(self.errors)),
        }
    }
}
