//! Windowed power envelope, after Pure Data's `env~`.
//!
//! Samples arrive in blocks and are appended to a history ring. Every
//! `real_period` samples (the hop rounded up to a whole number of blocks)
//! the newest `window_size` samples are squared and weighted by a Hann
//! window normalised to unit sum, which gives their weighted mean square.
//! That power is written into the next slot of an overlap ring and the
//! reported envelope is the mean of the slots filled so far.
//!
//! History the ring has not been given yet reads as zero, so the first
//! analyses after construction see leading silence.
//!
//! # Example
//!
//! ```rust
//! use arbor_analysis::EnvPd;
//! use arbor_core::Context;
//!
//! let ctx = Context::new(48000.0);
//! let mut env = EnvPd::new(&ctx, 256, 64, 64).unwrap();
//! let block = [0.5f32; 64];
//! for _ in 0..32 {
//!     env.process_block(&block);
//! }
//! assert!((env.tick() - 0.5).abs() < 1e-4);
//! ```

use arbor_core::{Context, Mempool, PoolBuffer, PoolError, RingBuffer, Window, pow_to_db};

/// Overlap slots available to the summing ring.
pub const MAX_OVERLAP: usize = 32;
/// Minimum extra history kept beyond the largest window.
pub const INIT_VS_TAKEN: usize = 64;
/// Default analysis window.
pub const ENV_WINDOW_SIZE: usize = 1024;
/// Default hop.
pub const ENV_HOP_SIZE: usize = 256;

/// Windowed RMS estimator with hop-based updates.
#[derive(Debug)]
pub struct EnvPd {
    history: RingBuffer,
    window: PoolBuffer<f32>,
    sums: [f32; MAX_OVERLAP],
    slot: usize,
    filled: usize,
    overlaps: usize,
    phase: usize,
    hop_size: usize,
    real_period: usize,
    window_size: usize,
    block_size: usize,
    result: f32,
}

impl EnvPd {
    /// Create an estimator from the context's pool.
    ///
    /// The history is sized once for `max(window_size, ENV_WINDOW_SIZE)`;
    /// later [`reconfigure`](Self::reconfigure) calls stay inside it.
    pub fn new(
        ctx: &Context,
        window_size: usize,
        hop_size: usize,
        block_size: usize,
    ) -> Result<Self, PoolError> {
        Self::new_in(ctx, ctx.pool(), window_size, hop_size, block_size)
    }

    /// Create an estimator from `pool`.
    pub fn new_in(
        ctx: &Context,
        pool: &Mempool,
        window_size: usize,
        hop_size: usize,
        block_size: usize,
    ) -> Result<Self, PoolError> {
        let block_size = block_size.max(1);
        let max_window = window_size.max(ENV_WINDOW_SIZE);
        let allowance = block_size.max(INIT_VS_TAKEN);

        let window = ctx.alloc(pool, max_window)?;
        let history = RingBuffer::new_in(ctx, pool, max_window + allowance)?;

        let mut env = Self {
            history,
            window,
            sums: [0.0; MAX_OVERLAP],
            slot: 0,
            filled: 0,
            overlaps: 1,
            phase: 0,
            hop_size: 0,
            real_period: 0,
            window_size: 0,
            block_size,
            result: 0.0,
        };
        env.reconfigure(window_size, hop_size);
        Ok(env)
    }

    /// Re-derive the window and hop geometry.
    ///
    /// The window is clamped to `1..=max_window_size()`. A zero hop becomes
    /// half the window, and the hop is raised so the window never spans
    /// more than [`MAX_OVERLAP`] hops. The phase counter and overlap slots
    /// restart; the history and last result are kept.
    pub fn reconfigure(&mut self, window_size: usize, hop_size: usize) {
        let window_size = window_size.clamp(1, self.max_window_size());
        let mut hop_size = if hop_size == 0 { window_size / 2 } else { hop_size };
        hop_size = hop_size.max(window_size / MAX_OVERLAP + 1);

        let rem = hop_size % self.block_size;
        let real_period = if rem == 0 {
            hop_size
        } else {
            hop_size + self.block_size - rem
        };

        self.window_size = window_size;
        self.hop_size = hop_size;
        self.real_period = real_period;
        self.overlaps = window_size.div_ceil(real_period).clamp(1, MAX_OVERLAP);
        Window::Hann.fill_normalized(&mut self.window[..window_size]);

        self.phase = 0;
        self.slot = 0;
        self.filled = 0;
        self.sums = [0.0; MAX_OVERLAP];

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "env_pd: window={window_size}, hop={hop_size}, real_period={real_period}, overlaps={}",
            self.overlaps
        );
    }

    /// Append a block of input and run any analyses that came due.
    ///
    /// Blocks of any length are accepted. The hop is counted in samples,
    /// and a block spanning several hops runs one analysis per hop, each on
    /// the history as it stood at that point.
    pub fn process_block(&mut self, input: &[f32]) {
        let mut rest = input;
        while !rest.is_empty() {
            let due = self.real_period - self.phase;
            let (now, later) = rest.split_at(due.min(rest.len()));
            self.history.extend_from_slice(now);
            self.phase += now.len();
            if self.phase == self.real_period {
                self.phase = 0;
                self.analyze();
            }
            rest = later;
        }
    }

    fn analyze(&mut self) {
        let power: f32 = self.window[..self.window_size]
            .iter()
            .enumerate()
            .map(|(age, w)| {
                let x = self.history.get(age);
                w * x * x
            })
            .sum();

        self.sums[self.slot] = power;
        self.slot = (self.slot + 1) % self.overlaps;
        self.filled = (self.filled + 1).min(self.overlaps);
        self.result = self.sums[..self.filled].iter().sum::<f32>() / self.filled as f32;
    }

    /// RMS amplitude of the latest result. No side effects.
    #[inline]
    pub fn tick(&self) -> f32 {
        self.result.sqrt()
    }

    /// Latest result on the Pd level scale, where unit RMS reads 100 dB.
    #[inline]
    pub fn tick_db(&self) -> f32 {
        pow_to_db(self.result)
    }

    /// Latest mean-square result.
    pub fn power(&self) -> f32 {
        self.result
    }

    /// Analysis window in samples.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Requested hop in samples.
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Hop rounded up to a multiple of the block size.
    pub fn real_period(&self) -> usize {
        self.real_period
    }

    /// Block size the hop is rounded to.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Overlap slots averaged into the result.
    pub fn overlaps(&self) -> usize {
        self.overlaps
    }

    /// Largest window the history was sized for.
    pub fn max_window_size(&self) -> usize {
        self.window.len()
    }
}
