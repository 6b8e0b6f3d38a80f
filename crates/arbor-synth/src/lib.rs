//! Arbor Synth - oscillators for the arbor DSP crates
//!
//! This crate provides sound sources, from aliasing control-rate ramps up to
//! hard-syncable band-limited oscillators. Every oscillator is created from
//! an [`arbor_core::Context`], copies its sample rate, and can re-derive its
//! increment later with `set_sample_rate`.
//!
//! # Oscillators
//!
//! ## Phase and Tables
//!
//! - [`Phasor`] - Aliasing 0..1 ramp with wrap reporting
//! - [`Cycle`] - Sine
//! - [`Table`] - Aliasing playback of a borrowed single-cycle table
//! - [`Wavetable`] - Anti-aliased playback through an octave mipmap
//! - [`Triangle`], [`Square`], [`Sawtooth`] - Additive per-octave tables
//!
//! ## Edge-Corrected
//!
//! - [`PolyTri`], [`PolyPulse`], [`PolySaw`] - PolyBLEP/BLAMP, no memory
//! - [`MbPulse`], [`MbTriangle`], [`MbSaw`] - minBLEP with sub-sample hard sync
//!
//! ```rust
//! use arbor_core::Context;
//! use arbor_synth::{MbPulse, MbSaw};
//!
//! let ctx = Context::new(48000.0);
//! let mut master = MbSaw::new(&ctx);
//! let mut slave = MbPulse::new(&ctx);
//! master.set_freq(100.0);
//! slave.set_freq(310.0);
//! slave.set_width(-0.4);
//!
//! let mut block = [0.0f32; 256];
//! for y in &mut block {
//!     master.tick();
//!     slave.sync_in(master.sync_out());
//!     *y = slave.tick();
//! }
//! ```
//!
//! ## Other Sources
//!
//! - [`Noise`] - White or pink, over any [`arbor_core::RandomSource`]
//! - [`Neuron`] - Hodgkin-Huxley cell driven as an oscillator
//!
//! # Memory
//!
//! Only [`Wavetable`] and the additive oscillators reserve pool memory; their
//! constructors return `Result<_, PoolError>` and the tables are released
//! when the oscillator is dropped. The minBLEP oscillators keep their
//! correction buffer inline.
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! arbor-synth = { version = "0.1", default-features = false }
//! ```
//!
//! [`PoolError`]: arbor_core::PoolError

#![cfg_attr(not(feature = "std"), no_std)]

pub mod band_limited;
pub mod mb_pulse;
pub mod mb_saw;
pub mod mb_triangle;
pub mod minblep;
pub mod neuron;
pub mod noise;
pub mod phasor;
pub mod polyblep;
pub mod wavetable;

// Re-export main types at crate root
pub use band_limited::{Sawtooth, Square, Triangle};
pub use mb_pulse::MbPulse;
pub use mb_saw::MbSaw;
pub use mb_triangle::MbTriangle;
pub use neuron::{Neuron, NeuronMode};
pub use noise::{Noise, NoiseType};
pub use phasor::{Cycle, Phasor};
pub use polyblep::{PolyPulse, PolySaw, PolyTri, poly_blamp, poly_blep};
pub use wavetable::{Table, Wavetable};
