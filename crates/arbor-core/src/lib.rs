//! Arbor Core - runtime primitives shared by the arbor DSP crates
//!
//! This crate provides the pieces every arbor component is built on: the
//! budgeted memory pool, the runtime context, circular sample storage,
//! analysis windows, and the filter capability. Everything here is real-time
//! safe once constructed: allocation happens only when a component is
//! created, never while it processes audio.
//!
//! # Core Abstractions
//!
//! ## Memory and Context
//!
//! - [`Mempool`] / [`PoolBuffer`] - Byte-budgeted pool; buffers return their
//!   bytes when dropped
//! - [`Context`] - Sample rate, default pool, error callback, random seed
//!
//! ## Buffers and Windows
//!
//! - [`RingBuffer`] - Fixed-capacity circular sample store
//! - [`WrappingIndex`] - Cursor that wraps modulo a capacity
//! - [`Window`] - Rectangular, Hann, Hamming, Blackman
//!
//! ## Filters
//!
//! All filters implement [`Filter`] (`tick` / `reset`):
//!
//! - [`OnePole`] - 6 dB/oct lowpass
//! - [`PoleZero`] - First-order section, doubles as a DC blocker
//! - [`Biquad`] - Second-order IIR with RBJ cookbook coefficients
//! - [`Butterworth`] - Cascaded biquads, order 2 to 8
//!
//! ## Randomness
//!
//! - [`RandomSource`] - Injected uniform source; closures qualify
//! - [`Xorshift32`] - Default generator
//!
//! ## Utilities
//!
//! - Level conversions: [`db_to_linear`], [`linear_to_db`], [`pow_to_db`], [`rms_to_db`]
//! - Time: [`ms_to_samples`], [`decay_coeff`]
//!
//! # no_std Support
//!
//! Disable the default `std` feature to build for embedded targets:
//!
//! ```toml
//! [dependencies]
//! arbor-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use arbor_core::{Context, Filter, OnePole, RingBuffer};
//!
//! let ctx = Context::new(48000.0);
//! let mut history = RingBuffer::new(&ctx, 1024).unwrap();
//! let mut smoother = OnePole::new(ctx.sample_rate(), 200.0);
//!
//! for i in 0..2048 {
//!     let x = if i % 100 < 50 { 1.0 } else { -1.0 };
//!     history.push(smoother.tick(x));
//! }
//! assert!(history.get(0).abs() <= 1.0);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocations in audio processing paths
//! - **Scoped ownership**: Dropping a component releases its pool memory
//! - **Clamp, don't fail**: Out-of-range parameters are clamped; only
//!   allocation and a few explicit setters return errors

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod biquad;
pub mod context;
pub mod error;
pub mod filter;
pub mod math;
pub mod mempool;
pub mod one_pole;
pub mod pole_zero;
pub mod random;
pub mod ring_buffer;
pub mod window;

// Re-export main types at crate root
pub use biquad::{
    Biquad, Butterworth, ButterworthType, Coefficients, bandpass_coefficients,
    highpass_coefficients, lowpass_coefficients,
};
pub use context::{Context, ErrorCallback};
pub use error::{ParamError, PoolError};
pub use filter::Filter;
pub use math::{
    clamp, db_to_linear, decay_coeff, flush_denormal, lerp, linear_to_db, ms_to_samples,
    pow_to_db, rms_to_db,
};
pub use mempool::{Mempool, PoolBuffer};
pub use one_pole::OnePole;
pub use pole_zero::PoleZero;
pub use random::{RandomSource, Xorshift32};
pub use ring_buffer::{RingBuffer, WrappingIndex};
pub use window::Window;
