//! Reusable record containers
//!
//! Every buffered `write()` copies the caller's bytes into an [`Item`]. The
//! pool keeps drained items around so the hot path does not allocate once the
//! sink has warmed up.
//!
//! ```text
//! [write()] → [ItemPool::get] → [RingBuffer] → [flush task] → [ItemPool::put]
//! ```
//!
//! Items whose buffer grew past the reuse ceiling (one unusually large record)
//! are discarded on return instead of pinning that memory in the pool.

use bytes::BytesMut;
use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicU64, Ordering};

/// Initial capacity of a freshly allocated item buffer
pub const DEFAULT_ITEM_CAPACITY: usize = 256;

/// Items with a larger buffer than this are not returned to the pool
pub const DEFAULT_REUSE_CEILING: usize = 16 * 1024;

/// One log record travelling from a producer to the flush task
#[derive(Debug)]
pub struct Item {
    data: BytesMut,
    seq: u64,
}

impl Item {
    /// Wrap an owned buffer. The sequence number is assigned on ring insertion.
    pub fn new(data: BytesMut) -> Self {
        Self { data, seq: 0 }
    }

    /// Record bytes
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write cursor value of the slot this item was inserted at
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    #[inline]
    pub(crate) fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    /// Capacity of the backing buffer
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }
}

/// Pool metrics
#[derive(Debug, Default)]
pub struct ItemPoolMetrics {
    /// Items served from the pool
    pub hits: AtomicU64,

    /// Items that had to be allocated
    pub misses: AtomicU64,

    /// Items returned to the pool
    pub returns: AtomicU64,

    /// Items discarded on return (over the ceiling, or pool full)
    pub discards: AtomicU64,
}

impl ItemPoolMetrics {
    pub const fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            returns: AtomicU64::new(0),
            discards: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            discards: self.discards.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of pool metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub returns: u64,
    pub discards: u64,
}

/// Lock-free pool of reusable items, scoped to one writer
pub struct ItemPool {
    queue: ArrayQueue<BytesMut>,
    item_capacity: usize,
    reuse_ceiling: usize,
    metrics: ItemPoolMetrics,
}

impl ItemPool {
    /// Create a pool holding up to `pool_size` idle items.
    ///
    /// The pool starts empty and fills as the flush task returns drained
    /// items, so an idle sink costs nothing.
    pub fn new(pool_size: usize, item_capacity: usize, reuse_ceiling: usize) -> Self {
        Self {
            queue: ArrayQueue::new(pool_size.max(1)),
            item_capacity,
            reuse_ceiling: reuse_ceiling.max(item_capacity),
            metrics: ItemPoolMetrics::new(),
        }
    }

    /// Pool sized for a ring of `slots` slots with default item sizing
    pub fn for_ring(slots: usize) -> Self {
        Self::new(slots, DEFAULT_ITEM_CAPACITY, DEFAULT_REUSE_CEILING)
    }

    /// Get an item holding a copy of `bytes`
    #[inline]
    pub fn get(&self, bytes: &[u8]) -> Item {
        let mut data = match self.queue.pop() {
            Some(buf) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                buf
            }
            None => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                BytesMut::with_capacity(self.item_capacity.max(bytes.len()))
            }
        };
        data.extend_from_slice(bytes);
        Item::new(data)
    }

    /// Return an item once its bytes have been copied out
    #[inline]
    pub fn put(&self, item: Item) {
        let mut data = item.data;
        if data.capacity() > self.reuse_ceiling {
            self.metrics.discards.fetch_add(1, Ordering::Relaxed);
            return;
        }

        data.clear();
        match self.queue.push(data) {
            Ok(()) => {
                self.metrics.returns.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.metrics.discards.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Idle items currently held
    #[inline]
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    #[inline]
    pub fn reuse_ceiling(&self) -> usize {
        self.reuse_ceiling
    }

    #[inline]
    pub fn metrics(&self) -> &ItemPoolMetrics {
        &self.metrics
    }
}

#[cfg(test)]
#[path = "pool_test.rs"]
mod pool_test;
