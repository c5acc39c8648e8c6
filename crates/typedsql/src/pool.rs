//! Scratch buffer pool used while rendering and logging statements.
//!
//! Each checkout hands out a buffer owned exclusively by the guard. Dropping
//! the guard clears the buffer and returns it, so contents never leak from
//! one call into the next.
//!
//! # Example
//!
//! ```ignore
//! let pool = BufferPool::new();
//! let mut buf = pool.checkout_buf();
//! buf.push_str("SELECT 1");
//! // returned (cleared) when `buf` is dropped
//! ```

use crate::value::Scalar;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

const DEFAULT_MAX_RETAINED: usize = 64;

/// Buffers larger than this are dropped instead of retained.
const MAX_RETAINED_BYTES: usize = 64 * 1024;

/// Argument vectors with room for more than this many values are dropped.
const MAX_RETAINED_ARGS: usize = 4 * 1024;

/// Thread-safe pool of SQL text buffers and argument vectors.
pub struct BufferPool {
    bufs: Mutex<Vec<String>>,
    args: Mutex<Vec<Vec<Scalar>>>,
    max_retained: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle_bufs", &self.idle_bufs())
            .field("idle_args", &self.idle_args())
            .field("max_retained", &self.max_retained)
            .finish()
    }
}

impl BufferPool {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_RETAINED)
    }

    /// Retain at most `max_retained` idle buffers of each kind.
    pub fn with_capacity(max_retained: usize) -> Self {
        Self {
            bufs: Mutex::new(Vec::new()),
            args: Mutex::new(Vec::new()),
            max_retained,
        }
    }

    pub fn checkout_buf(&self) -> PooledBuf<'_> {
        let buf = self
            .bufs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        PooledBuf { pool: self, buf }
    }

    pub fn checkout_args(&self) -> PooledArgs<'_> {
        let args = self
            .args
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        PooledArgs { pool: self, args }
    }

    pub fn idle_bufs(&self) -> usize {
        self.bufs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn idle_args(&self) -> usize {
        self.args.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn put_buf(&self, mut buf: String) {
        if buf.capacity() > MAX_RETAINED_BYTES {
            return;
        }
        buf.clear();
        let mut bufs = self.bufs.lock().unwrap_or_else(PoisonError::into_inner);
        if bufs.len() < self.max_retained {
            bufs.push(buf);
        }
    }

    fn put_args(&self, mut args: Vec<Scalar>) {
        if args.capacity() > MAX_RETAINED_ARGS {
            return;
        }
        args.clear();
        let mut pooled = self.args.lock().unwrap_or_else(PoisonError::into_inner);
        if pooled.len() < self.max_retained {
            pooled.push(args);
        }
    }
}

/// A checked-out SQL text buffer.
pub struct PooledBuf<'p> {
    pool: &'p BufferPool,
    buf: String,
}

impl Deref for PooledBuf<'_> {
    type Target = String;

    fn deref(&self) -> &String {
        &self.buf
    }
}

impl DerefMut for PooledBuf<'_> {
    fn deref_mut(&mut self) -> &mut String {
        &mut self.buf
    }
}

impl Drop for PooledBuf<'_> {
    fn drop(&mut self) {
        self.pool.put_buf(std::mem::take(&mut self.buf));
    }
}

/// A checked-out argument vector.
pub struct PooledArgs<'p> {
    pool: &'p BufferPool,
    args: Vec<Scalar>,
}

impl Deref for PooledArgs<'_> {
    type Target = Vec<Scalar>;

    fn deref(&self) -> &Vec<Scalar> {
        &self.args
    }
}

impl DerefMut for PooledArgs<'_> {
    fn deref_mut(&mut self) -> &mut Vec<Scalar> {
        &mut self.args
    }
}

impl Drop for PooledArgs<'_> {
    fn drop(&mut self) {
        self.pool.put_args(std::mem::take(&mut self.args));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returned_buffers_are_cleared_and_reused() {
        let pool = BufferPool::new();
        {
            let mut buf = pool.checkout_buf();
            buf.push_str("SELECT secret");
            let mut args = pool.checkout_args();
            args.push(Scalar::Int(1));
        }
        assert_eq!(pool.idle_bufs(), 1);
        assert_eq!(pool.idle_args(), 1);

        let buf = pool.checkout_buf();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= "SELECT secret".len());
        assert!(pool.checkout_args().is_empty());
    }

    #[test]
    fn concurrent_checkouts_are_distinct() {
        let pool = BufferPool::new();
        let mut a = pool.checkout_buf();
        let mut b = pool.checkout_buf();
        a.push('a');
        b.push('b');
        assert_eq!(a.as_str(), "a");
        assert_eq!(b.as_str(), "b");
    }

    #[test]
    fn retention_is_bounded() {
        let pool = BufferPool::with_capacity(1);
        let a = pool.checkout_buf();
        let b = pool.checkout_buf();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_bufs(), 1);
    }

    #[test]
    fn oversized_buffers_are_not_retained() {
        let pool = BufferPool::new();
        {
            let mut buf = pool.checkout_buf();
            buf.reserve(MAX_RETAINED_BYTES + 1);
            let mut args = pool.checkout_args();
            args.extend((0..=MAX_RETAINED_ARGS as i64).map(Scalar::Int));
        }
        assert_eq!(pool.idle_bufs(), 0);
        assert_eq!(pool.idle_args(), 0);

        {
            let mut args = pool.checkout_args();
            args.extend((0..16).map(Scalar::Int));
        }
        assert_eq!(pool.idle_args(), 1);
    }

    #[test]
    fn pool_is_shareable_across_threads() {
        let pool = std::sync::Arc::new(BufferPool::new());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let pool = std::sync::Arc::clone(&pool);
                std::thread::spawn(move || {
                    let mut buf = pool.checkout_buf();
                    buf.push_str(&i.to_string());
                    buf.len()
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), 1);
        }
        assert!(pool.idle_bufs() <= 4);
    }
}
