//! Budgeted memory pool for component state.
//!
//! Every buffer a component needs (ring buffers, analysis frames, wavetable
//! octaves) is reserved from a [`Mempool`] at construction. A pool has a fixed
//! byte budget; reservations come back zero-initialised as a [`PoolBuffer`],
//! and dropping the buffer returns its bytes to the pool. Because an
//! aggregate owns its children's buffers, dropping the aggregate releases the
//! whole tree at once.
//!
//! Reservations only happen on construction and reconfiguration paths, never
//! per sample or per block.
//!
//! # Example
//!
//! ```rust
//! use arbor_core::Mempool;
//!
//! let pool = Mempool::new(4096);
//! let buf = pool.alloc::<f32>(256).unwrap();
//! assert_eq!(pool.used(), 1024);
//! assert!(buf.iter().all(|&x| x == 0.0));
//!
//! drop(buf);
//! assert_eq!(pool.used(), 0);
//! ```
//!
//! # Threading
//!
//! Pools are single-threaded (`Rc`-shared). Clones of a `Mempool` share one
//! budget.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec;
use core::cell::Cell;
use core::fmt;
use core::ops::{Deref, DerefMut};

use crate::PoolError;

#[derive(Debug)]
struct PoolState {
    capacity: usize,
    used: Cell<usize>,
    peak: Cell<usize>,
}

/// Shared byte budget from which component buffers are reserved.
#[derive(Clone)]
pub struct Mempool {
    state: Rc<PoolState>,
}

impl Mempool {
    /// Default capacity of a context's pool (1 MiB).
    pub const DEFAULT_SIZE: usize = 1 << 20;

    /// Create a pool with the given capacity in bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Rc::new(PoolState {
                capacity,
                used: Cell::new(0),
                peak: Cell::new(0),
            }),
        }
    }

    /// Reserve `len` zero-initialised elements.
    ///
    /// Fails with [`PoolError::Exhausted`] when the pool cannot cover
    /// `len * size_of::<T>()` bytes; the pool is unchanged in that case.
    pub fn alloc<T: Copy + Default>(&self, len: usize) -> Result<PoolBuffer<T>, PoolError> {
        let bytes = len.saturating_mul(core::mem::size_of::<T>());
        if bytes == 0 {
            return Err(PoolError::ZeroSized);
        }

        let available = self.available();
        if bytes > available {
            #[cfg(feature = "tracing")]
            tracing::warn!("mempool: requested {bytes} bytes, {available} available");
            return Err(PoolError::Exhausted {
                requested: bytes,
                available,
            });
        }

        let used = self.state.used.get() + bytes;
        self.state.used.set(used);
        if used > self.state.peak.get() {
            self.state.peak.set(used);
        }

        Ok(PoolBuffer {
            data: vec![T::default(); len].into_boxed_slice(),
            bytes,
            pool: self.clone(),
        })
    }

    /// Total budget in bytes.
    pub fn capacity(&self) -> usize {
        self.state.capacity
    }

    /// Bytes currently reserved.
    pub fn used(&self) -> usize {
        self.state.used.get()
    }

    /// Bytes still free.
    pub fn available(&self) -> usize {
        self.state.capacity - self.state.used.get()
    }

    /// Highest simultaneous reservation seen since the pool was created.
    pub fn peak(&self) -> usize {
        self.state.peak.get()
    }

    /// Whether two handles share the same budget.
    pub fn same_pool(&self, other: &Mempool) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    fn release(&self, bytes: usize) {
        let used = self.state.used.get();
        debug_assert!(bytes <= used, "mempool release exceeds reservation");
        self.state.used.set(used.saturating_sub(bytes));
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

impl fmt::Debug for Mempool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mempool")
            .field("capacity", &self.capacity())
            .field("used", &self.used())
            .field("peak", &self.peak())
            .finish()
    }
}

/// Fixed-length buffer reserved from a [`Mempool`].
///
/// Dereferences to a slice. The length never changes after reservation.
pub struct PoolBuffer<T> {
    data: Box<[T]>,
    bytes: usize,
    pool: Mempool,
}

impl<T> PoolBuffer<T> {
    /// The pool this buffer was reserved from.
    pub fn pool(&self) -> &Mempool {
        &self.pool
    }

    /// Size of the reservation in bytes.
    pub fn reserved_bytes(&self) -> usize {
        self.bytes
    }
}

impl<T> Deref for PoolBuffer<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for PoolBuffer<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> Drop for PoolBuffer<T> {
    fn drop(&mut self) {
        self.pool.release(self.bytes);
    }
}

impl<T: fmt::Debug> fmt::Debug for PoolBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolBuffer")
            .field("len", &self.data.len())
            .field("bytes", &self.bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_is_zeroed_and_accounted() {
        let pool = Mempool::new(1024);
        let buf = pool.alloc::<f32>(64).unwrap();
        assert_eq!(buf.len(), 64);
        assert!(buf.iter().all(|&x| x == 0.0));
        assert_eq!(pool.used(), 256);
        assert_eq!(pool.available(), 768);
    }

    #[test]
    fn drop_releases_bytes() {
        let pool = Mempool::new(1024);
        {
            let _a = pool.alloc::<f32>(64).unwrap();
            let _b = pool.alloc::<u16>(32).unwrap();
            assert_eq!(pool.used(), 256 + 64);
        }
        assert_eq!(pool.used(), 0);
        assert_eq!(pool.peak(), 320);
    }

    #[test]
    fn exhaustion_leaves_pool_unchanged() {
        let pool = Mempool::new(100);
        let _a = pool.alloc::<f32>(20).unwrap();
        let err = pool.alloc::<f32>(10).unwrap_err();
        assert_eq!(
            err,
            PoolError::Exhausted {
                requested: 40,
                available: 20
            }
        );
        assert_eq!(pool.used(), 80);
    }

    #[test]
    fn zero_sized_rejected() {
        let pool = Mempool::new(100);
        assert_eq!(pool.alloc::<f32>(0).unwrap_err(), PoolError::ZeroSized);
    }

    #[test]
    fn clones_share_budget() {
        let pool = Mempool::new(100);
        let other = pool.clone();
        let _a = other.alloc::<u8>(60).unwrap();
        assert_eq!(pool.used(), 60);
        assert!(pool.same_pool(&other));
        assert!(!pool.same_pool(&Mempool::new(100)));
    }

    #[test]
    fn buffer_is_writable() {
        let pool = Mempool::new(64);
        let mut buf = pool.alloc::<f32>(4).unwrap();
        buf[2] = 1.5;
        buf.fill(0.25);
        assert_eq!(&buf[..], &[0.25; 4]);
        assert!(buf.pool().same_pool(&pool));
        assert_eq!(buf.reserved_bytes(), 16);
    }
}
