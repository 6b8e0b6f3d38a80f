//! Configuration for the arbor analysis chain.
//!
//! Parameter sets are plain serde structs that load from TOML, validate in
//! one pass, and build or reconfigure the objects from `arbor-core` and
//! `arbor-analysis`.
//!
//! # Features
//!
//! - **Parameter sets**: [`ContextConfig`], [`EnvConfig`], [`SnacConfig`] and
//!   [`PeriodConfig`], bundled as [`AnalysisConfig`]
//! - **TOML**: [`AnalysisConfig::from_toml_str`] and
//!   [`AnalysisConfig::to_toml_string`]; missing keys take library defaults
//! - **Validation**: every out-of-range value is reported, not just the first
//!
//! # Example
//!
//! ```rust
//! use arbor_config::AnalysisConfig;
//!
//! let config = AnalysisConfig::from_toml_str(
//!     r#"
//!     [context]
//!     sample_rate = 44100.0
//!
//!     [period]
//!     frame_size = 128
//!     min_fidelity = 0.6
//!     "#,
//! )
//! .unwrap();
//! config.validate().unwrap();
//!
//! let ctx = config.build_context();
//! let (mut input, mut output) = config.period.buffers();
//! let mut detector = config.build_detector(&ctx, &mut input, &mut output).unwrap();
//! for n in 0..4096 {
//!     detector.find_period((n as f32 * 0.05).sin());
//! }
//! ```

mod analysis_config;
mod error;

/// Collecting parameter validation.
pub mod validation;

pub use analysis_config::{
    AnalysisConfig, ContextConfig, EnvConfig, MAX_SAMPLE_RATE, PeriodConfig, SnacConfig,
};
pub use error::ConfigError;
pub use validation::{ValidationError, ValidationResult, Validator};
