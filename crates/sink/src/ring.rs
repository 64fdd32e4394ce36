//! Lock-free multi-producer / single-consumer ring of log records
//!
//! Producers claim a slot by bumping a shared write cursor and then publish
//! their item with a compare-and-swap from empty. The consumer clears the slot
//! at its read cursor back to empty. No lock is ever taken.
//!
//! ```text
//! producers ──fetch_add──► write_cursor      RingReader.read_cursor ◄── flush task
//!     │                                              │
//!     └──CAS(null → item)──► slots[seq & mask] ──take──┘
//! ```
//!
//! # Overload
//!
//! If the claimed slot still holds an undrained item, or another producer wins
//! the CAS, the insert retries on a fresh slot. After `max_retries + 1`
//! attempts the item is handed back to the caller and the alert callback
//! fires with the attempt count. Producers never block.
//!
//! # Ordering
//!
//! Without collisions items drain in claim order. An empty slot at the read
//! cursor is either a claim not yet published or a hole left by an insert
//! that gave up on it. The reader waits while any insert is in flight and
//! steps over the slot only once none is, so a hole is never confused with
//! a slow producer. Under contention relative order is not preserved.
//!
//! # Single consumer
//!
//! The read cursor lives in [`RingReader`], which is not `Clone`. Exactly one
//! drainer exists per ring by construction.

use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, AtomicU64, AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

use crate::pool::Item;

/// Callback fired when an insert gives up, receiving the number of attempts
pub type Alerter = Arc<dyn Fn(usize) + Send + Sync>;

/// Number of slots allocated for a requested capacity
#[inline]
pub fn slots_for(capacity: usize) -> usize {
    capacity.max(1).next_power_of_two()
}

/// Fixed-size MPSC ring of [`Item`]s
pub struct RingBuffer {
    /// Next logical slot to claim (monotonic)
    write_cursor: CachePadded<AtomicU64>,

    /// Items published or about to be published
    len: CachePadded<AtomicUsize>,

    /// `add` calls between their first claim and their outcome
    in_flight: CachePadded<AtomicUsize>,

    slots: Box<[AtomicPtr<Item>]>,
    mask: u64,
    max_retries: usize,
    alerter: Option<Alerter>,

    collisions: AtomicU64,
    drops: AtomicU64,
}

impl RingBuffer {
    /// Create a ring and its only reader.
    ///
    /// `capacity` is rounded up to the next power of two.
    pub fn with_reader(
        capacity: usize,
        max_retries: usize,
        alerter: Option<Alerter>,
    ) -> (Arc<Self>, RingReader) {
        let size = slots_for(capacity);
        let slots = (0..size)
            .map(|_| AtomicPtr::new(ptr::null_mut()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let ring = Arc::new(Self {
            write_cursor: CachePadded::new(AtomicU64::new(0)),
            len: CachePadded::new(AtomicUsize::new(0)),
            in_flight: CachePadded::new(AtomicUsize::new(0)),
            slots,
            mask: size as u64 - 1,
            max_retries,
            alerter,
            collisions: AtomicU64::new(0),
            drops: AtomicU64::new(0),
        });

        let reader = RingReader {
            ring: Arc::clone(&ring),
            read_cursor: 0,
        };

        (ring, reader)
    }

    #[inline]
    fn slot(&self, cursor: u64) -> &AtomicPtr<Item> {
        &self.slots[(cursor & self.mask) as usize]
    }

    /// Insert an item, retrying on collision.
    ///
    /// Returns the sequence number the item was stored under, or gives the
    /// item back once every attempt collided. The caller decides what to do
    /// with a rejected item; it is not retained by the ring.
    pub fn add(&self, item: Item) -> Result<u64, Item> {
        // SeqCst on the claim counter and cursor: the reader reads the cursor
        // and then this counter, and must see every claim below the cursor
        // as either finished or still counted.
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let result = self.try_add(Box::new(item));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        result.map_err(|item| {
            self.drops.fetch_add(1, Ordering::Relaxed);
            if let Some(alert) = &self.alerter {
                alert(self.max_retries + 1);
            }
            *item
        })
    }

    fn try_add(&self, mut item: Box<Item>) -> Result<u64, Box<Item>> {
        for _ in 0..=self.max_retries {
            let seq = self.write_cursor.fetch_add(1, Ordering::SeqCst);
            let slot = self.slot(seq);

            if !slot.load(Ordering::Acquire).is_null() {
                self.collisions.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            item.set_seq(seq);
            self.len.fetch_add(1, Ordering::AcqRel);
            let raw = Box::into_raw(item);

            match slot.compare_exchange(ptr::null_mut(), raw, Ordering::SeqCst, Ordering::Acquire) {
                Ok(_) => return Ok(seq),
                Err(_) => {
                    self.len.fetch_sub(1, Ordering::AcqRel);
                    self.collisions.fetch_add(1, Ordering::Relaxed);
                    // SAFETY: the CAS failed, so `raw` was never published and
                    // this is still its only owner.
                    item = unsafe { Box::from_raw(raw) };
                }
            }
        }

        Err(item)
    }

    /// Number of slots (a power of two)
    #[inline]
    pub fn slots(&self) -> usize {
        self.slots.len()
    }

    /// Items currently held
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert attempts that hit an occupied or contended slot
    pub fn collisions(&self) -> u64 {
        self.collisions.load(Ordering::Relaxed)
    }

    /// Items given back after exhausting retries
    pub fn drops(&self) -> u64 {
        self.drops.load(Ordering::Relaxed)
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }
}

impl Drop for RingBuffer {
    fn drop(&mut self) {
        for slot in self.slots.iter() {
            let raw = slot.swap(ptr::null_mut(), Ordering::AcqRel);
            if !raw.is_null() {
                // SAFETY: non-null slot values always come from Box::into_raw
                // in `add`, and swapping to null took sole ownership.
                drop(unsafe { Box::from_raw(raw) });
            }
        }
    }
}

/// The single consumer of a [`RingBuffer`]
pub struct RingReader {
    ring: Arc<RingBuffer>,
    read_cursor: u64,
}

impl RingReader {
    /// Take the next item, or `None` if nothing is ready. Never blocks.
    ///
    /// Stops at an empty slot while an insert may still publish into it and
    /// resumes there on the next call.
    pub fn next(&mut self) -> Option<Item> {
        for _ in 0..self.ring.slots() {
            if let Some(item) = self.take() {
                return Some(item);
            }

            if self.ring.len() == 0 {
                return None;
            }

            // cursor first, then the claim counter; see `RingBuffer::add`
            if self.ring.write_cursor.load(Ordering::SeqCst) <= self.read_cursor {
                return None;
            }
            if self.ring.in_flight.load(Ordering::SeqCst) != 0 {
                return None;
            }

            // the claim here has finished: either it published just now or
            // it gave up and left a hole
            if let Some(item) = self.take() {
                return Some(item);
            }
            self.read_cursor += 1;
        }

        None
    }

    fn take(&mut self) -> Option<Item> {
        let slot = self.ring.slot(self.read_cursor);
        let raw = slot.load(Ordering::SeqCst);
        if raw.is_null() {
            return None;
        }

        // producers only publish into an empty slot, so nobody can replace
        // `raw` before this store
        slot.store(ptr::null_mut(), Ordering::Release);
        self.read_cursor += 1;
        self.ring.len.fetch_sub(1, Ordering::AcqRel);
        // SAFETY: see `RingBuffer::drop`; clearing the slot made us the owner.
        let item = unsafe { Box::from_raw(raw) };
        Some(*item)
    }

    /// Position of the next slot to drain
    pub fn read_cursor(&self) -> u64 {
        self.read_cursor
    }

    pub fn ring(&self) -> &Arc<RingBuffer> {
        &self.ring
    }
}

#[cfg(test)]
#[path = "ring_test.rs"]
mod ring_test;
