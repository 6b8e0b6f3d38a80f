//! Fixed-capacity circular sample store.
//!
//! The envelope and period detectors keep their recent input history here
//! and pull contiguous analysis windows out with [`RingBuffer::copy_latest`].
//! Cursor arithmetic lives in [`WrappingIndex`], so indices can never leave
//! `0..capacity`.

use crate::{Context, Mempool, PoolBuffer, PoolError};

/// Index that wraps modulo a fixed, nonzero capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrappingIndex {
    value: usize,
    capacity: usize,
}

impl WrappingIndex {
    /// Index 0 of a `capacity`-slot ring. A zero capacity is treated as 1.
    pub const fn new(capacity: usize) -> Self {
        Self {
            value: 0,
            capacity: if capacity == 0 { 1 } else { capacity },
        }
    }

    /// Current position, always `< capacity`.
    #[inline]
    pub const fn get(self) -> usize {
        self.value
    }

    /// Ring size.
    #[inline]
    pub const fn capacity(self) -> usize {
        self.capacity
    }

    /// Step forward by one slot.
    #[inline]
    pub fn advance(&mut self) {
        self.value += 1;
        if self.value == self.capacity {
            self.value = 0;
        }
    }

    /// Position `n` slots ahead.
    #[inline]
    pub const fn plus(self, n: usize) -> usize {
        (self.value + n % self.capacity) % self.capacity
    }

    /// Position `n` slots behind.
    #[inline]
    pub const fn minus(self, n: usize) -> usize {
        (self.value + self.capacity - n % self.capacity) % self.capacity
    }

    /// Back to slot 0.
    #[inline]
    pub fn reset(&mut self) {
        self.value = 0;
    }
}

/// Circular buffer of `f32` samples backed by pool memory.
///
/// Unwritten slots read as zero, so history requested before the ring has
/// filled is silence.
///
/// # Example
///
/// ```rust
/// use arbor_core::{Context, RingBuffer};
///
/// let ctx = Context::default();
/// let mut ring = RingBuffer::new(&ctx, 4).unwrap();
/// ring.extend_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
///
/// let mut window = [0.0; 3];
/// ring.copy_latest(&mut window);
/// assert_eq!(window, [3.0, 4.0, 5.0]);
/// assert_eq!(ring.get(0), 5.0);
/// ```
#[derive(Debug)]
pub struct RingBuffer {
    data: PoolBuffer<f32>,
    write: WrappingIndex,
}

impl RingBuffer {
    /// Allocate a ring of `capacity` samples from the context's pool.
    pub fn new(ctx: &Context, capacity: usize) -> Result<Self, PoolError> {
        Self::new_in(ctx, ctx.pool(), capacity)
    }

    /// Allocate a ring of `capacity` samples from `pool`.
    pub fn new_in(ctx: &Context, pool: &Mempool, capacity: usize) -> Result<Self, PoolError> {
        Ok(Self::from_buffer(ctx.alloc(pool, capacity)?))
    }

    /// Wrap an already reserved buffer.
    pub fn from_buffer(data: PoolBuffer<f32>) -> Self {
        let write = WrappingIndex::new(data.len());
        Self { data, write }
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Slot the next sample will be written to.
    #[inline]
    pub fn write_pos(&self) -> usize {
        self.write.get()
    }

    /// Append one sample, overwriting the oldest.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.data[self.write.get()] = sample;
        self.write.advance();
    }

    /// Append a block of samples.
    pub fn extend_from_slice(&mut self, samples: &[f32]) {
        for &s in samples {
            self.push(s);
        }
    }

    /// Sample written `age` pushes ago (0 = newest). Ages beyond the
    /// capacity wrap.
    #[inline]
    pub fn get(&self, age: usize) -> f32 {
        self.data[self.write.minus(age + 1)]
    }

    /// Copy the most recent `dst.len()` samples into `dst`, oldest first.
    ///
    /// Requests longer than the capacity are truncated; the tail of `dst`
    /// beyond the capacity is left untouched.
    pub fn copy_latest(&self, dst: &mut [f32]) {
        let n = dst.len().min(self.capacity());
        let start = self.write.minus(n);
        let first = (self.capacity() - start).min(n);
        dst[..first].copy_from_slice(&self.data[start..start + first]);
        dst[first..n].copy_from_slice(&self.data[..n - first]);
    }

    /// Zero the contents and rewind the cursor.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.write.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_index_arithmetic() {
        let mut idx = WrappingIndex::new(5);
        for _ in 0..7 {
            idx.advance();
        }
        assert_eq!(idx.get(), 2);
        assert_eq!(idx.plus(4), 1);
        assert_eq!(idx.minus(3), 4);
        assert_eq!(idx.minus(13), 4);
    }

    #[test]
    fn unwritten_history_is_silence() {
        let ctx = Context::default();
        let mut ring = RingBuffer::new(&ctx, 8).unwrap();
        ring.push(1.0);
        let mut window = [9.0; 4];
        ring.copy_latest(&mut window);
        assert_eq!(window, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn copy_latest_across_wrap() {
        let ctx = Context::default();
        let mut ring = RingBuffer::new(&ctx, 5).unwrap();
        ring.extend_from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let mut window = [0.0; 5];
        ring.copy_latest(&mut window);
        assert_eq!(window, [3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(ring.get(1), 6.0);
        assert_eq!(ring.write_pos(), 2);
    }

    #[test]
    fn clear_resets() {
        let ctx = Context::default();
        let mut ring = RingBuffer::new(&ctx, 4).unwrap();
        ring.extend_from_slice(&[1.0; 6]);
        ring.clear();
        assert_eq!(ring.write_pos(), 0);
        assert_eq!(ring.get(0), 0.0);
    }

    #[test]
    fn allocation_is_pool_accounted() {
        let ctx = Context::default();
        let pool = Mempool::new(64);
        let ring = RingBuffer::new_in(&ctx, &pool, 16).unwrap();
        assert_eq!(pool.used(), 64);
        assert!(RingBuffer::new_in(&ctx, &pool, 1).is_err());
        drop(ring);
        assert_eq!(pool.used(), 0);
    }
}
