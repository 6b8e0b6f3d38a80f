//! Library runtime context.
//!
//! A [`Context`] carries what every component needs at construction time:
//! the sample rate, the default [`Mempool`], the error callback, and the
//! seed from which default random sources are derived. Components copy what
//! they need when they are built and never hold a reference back to the
//! context, so a context can be mutated (e.g. a new sample rate) while its
//! components are alive. Propagating a sample-rate change to existing
//! components is the caller's job: each component exposes `set_sample_rate`.
//!
//! # Example
//!
//! ```rust
//! use arbor_core::{Context, Mempool};
//!
//! let ctx = Context::new(48000.0);
//! let frame = ctx.alloc::<f32>(ctx.pool(), 1024).unwrap();
//! assert_eq!(frame.len(), 1024);
//!
//! // Same component, caller-chosen pool.
//! let scratch = Mempool::new(8192);
//! let other = ctx.alloc::<f32>(&scratch, 1024).unwrap();
//! assert_eq!(scratch.used(), 4096);
//! # drop((frame, other));
//! ```

use core::cell::Cell;
use core::fmt;

use crate::random::scramble_seed;
use crate::{Mempool, PoolBuffer, PoolError, Xorshift32};

/// Callback invoked whenever an allocation routed through a context fails.
pub type ErrorCallback = fn(&PoolError);

/// Runtime context: sample rate, default pool, error callback, random seed.
pub struct Context {
    sample_rate: f32,
    inv_sample_rate: f32,
    pool: Mempool,
    seed: Cell<u32>,
    error_callback: Option<ErrorCallback>,
}

impl Context {
    /// Sample rate used by [`Context::default`].
    pub const DEFAULT_SAMPLE_RATE: f32 = 48000.0;

    /// Create a context with a default-sized pool.
    pub fn new(sample_rate: f32) -> Self {
        Self::with_pool(sample_rate, Mempool::default())
    }

    /// Create a context whose default pool holds `pool_size` bytes.
    pub fn with_pool_size(sample_rate: f32, pool_size: usize) -> Self {
        Self::with_pool(sample_rate, Mempool::new(pool_size))
    }

    /// Create a context around an existing pool.
    pub fn with_pool(sample_rate: f32, pool: Mempool) -> Self {
        let sample_rate = sanitize_rate(sample_rate);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "context: sample_rate={sample_rate}, pool={} bytes",
            pool.capacity()
        );

        Self {
            sample_rate,
            inv_sample_rate: 1.0 / sample_rate,
            pool,
            seed: Cell::new(0x2545_F491),
            error_callback: None,
        }
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Reciprocal of the sample rate.
    #[inline]
    pub fn inv_sample_rate(&self) -> f32 {
        self.inv_sample_rate
    }

    /// Change the sample rate used for components built from now on.
    ///
    /// Non-finite or non-positive rates are ignored.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate.is_finite() && sample_rate > 0.0 {
            self.sample_rate = sample_rate;
            self.inv_sample_rate = 1.0 / sample_rate;
        }
    }

    /// The default pool.
    #[inline]
    pub fn pool(&self) -> &Mempool {
        &self.pool
    }

    /// Install a callback for allocation failures.
    pub fn set_error_callback(&mut self, callback: ErrorCallback) {
        self.error_callback = Some(callback);
    }

    /// Remove the allocation-failure callback.
    pub fn clear_error_callback(&mut self) {
        self.error_callback = None;
    }

    /// Reserve `len` zeroed elements from `pool`, reporting failures through
    /// the error callback before returning them.
    pub fn alloc<T: Copy + Default>(
        &self,
        pool: &Mempool,
        len: usize,
    ) -> Result<PoolBuffer<T>, PoolError> {
        pool.alloc(len).inspect_err(|err| {
            if let Some(callback) = self.error_callback {
                callback(err);
            }
        })
    }

    /// Reseed the context's random stream.
    pub fn set_seed(&self, seed: u32) {
        self.seed.set(seed);
    }

    /// A new generator whose seed is drawn from the context's stream.
    ///
    /// Successive calls return independent generators; the sequence of
    /// generators is reproducible for a given [`Context::set_seed`].
    pub fn random_source(&self) -> Xorshift32 {
        let next = scramble_seed(self.seed.get());
        self.seed.set(next);
        Xorshift32::new(next)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SAMPLE_RATE)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("sample_rate", &self.sample_rate)
            .field("pool", &self.pool)
            .field("has_error_callback", &self.error_callback.is_some())
            .finish()
    }
}

fn sanitize_rate(sample_rate: f32) -> f32 {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        sample_rate
    } else {
        Context::DEFAULT_SAMPLE_RATE
    }
}
