//! Arbor Analysis - level, transient and period detection
//!
//! This crate provides the analysis side of arbor:
//!
//! - [`envelope`] - Peak-riding [`EnvelopeFollower`] and one-pole [`PowerFollower`]
//! - [`env_pd`] - [`EnvPd`], windowed RMS with hop-based updates
//! - [`attack`] - [`AttackDetection`], block-based transient detection
//! - [`snac`] - [`Snac`], normalised-autocorrelation period detection
//! - [`period`] - [`PeriodDetection`], streaming period tracking with
//!   octave-jump rejection
//!
//! ## Data Flow
//!
//! ```text
//! samples -> EnvPd (envelope) ----\
//!         -> Snac (period, fidelity) -> PeriodDetection -> period / frequency
//! ```
//!
//! Callers should check the fidelity before trusting a period: silence and
//! unpitched input are reported as fidelity 0, never as an error.
//!
//! ## Example
//!
//! ```rust
//! use arbor_analysis::PeriodDetection;
//! use arbor_core::Context;
//! use arbor_synth::PolySaw;
//!
//! let ctx = Context::new(48000.0);
//! let mut saw = PolySaw::new(&ctx);
//! saw.set_freq(220.0);
//!
//! let mut input = vec![0.0f32; 2048];
//! let mut output = vec![0.0f32; 2048];
//! let mut detector = PeriodDetection::new(&ctx, &mut input, &mut output, 256).unwrap();
//! for _ in 0..8192 {
//!     detector.find_period(0.5 * saw.tick());
//! }
//! assert!((detector.frequency() - 220.0).abs() < 2.2);
//! ```
//!
//! ## Memory
//!
//! [`EnvPd`], [`Snac`] and [`PeriodDetection`] reserve their buffers from an
//! [`arbor_core::Mempool`] when built and release them when dropped; a
//! `PeriodDetection` frees its envelope and detector together.

pub mod attack;
pub mod env_pd;
pub mod envelope;
pub mod period;
pub mod snac;

pub use attack::AttackDetection;
pub use env_pd::EnvPd;
pub use envelope::{EnvelopeFollower, PowerFollower};
pub use period::PeriodDetection;
pub use snac::Snac;
