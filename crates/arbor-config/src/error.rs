//! Error types for configuration operations.

use arbor_core::PoolError;
use thiserror::Error;

use crate::validation::ValidationError;

/// Errors that can occur while loading or applying a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// One or more parameters were rejected
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The pool could not hold the configured buffers
    #[error("allocation failed: {0}")]
    Pool(#[from] PoolError),
}
