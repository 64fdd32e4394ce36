//! Flush cycle and the background task that drives it
//!
//! ```text
//!            threshold crossed (write)          tick
//!                      │                          │
//!              CAS Idle → Flushing        CAS Idle → Flushing
//!                      └────────► flush_cycle ◄───┘
//!                                    │
//!              drain ring into ≤ BLOCK_SIZE block, write, sync, rotate?
//!                                    │
//!                             Flushing → Idle
//! ```
//!
//! A record that does not fit in the current block is carried, whole, into
//! the next cycle, which is requested immediately. A record larger than a
//! block is written alone in its own call.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use bytes::BytesMut;
use tokio::time::MissedTickBehavior;

use super::Core;
use super::config::BLOCK_SIZE;
use crate::pool::{Item, ItemPool};
use crate::ring::RingReader;

const IDLE: u8 = 0;
const FLUSHING: u8 = 1;

/// Single-flight guard for flush cycles
#[derive(Debug, Default)]
pub(crate) struct FlushState(AtomicU8);

impl FlushState {
    /// Idle → Flushing; false if a cycle is already running or requested
    #[inline]
    pub fn try_begin(&self) -> bool {
        self.0
            .compare_exchange(IDLE, FLUSHING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Flushing → Idle
    #[inline]
    pub fn finish(&self) {
        self.0.store(IDLE, Ordering::Release);
    }

    /// Enter Flushing regardless of current state (shutdown)
    #[inline]
    pub fn force(&self) {
        self.0.store(FLUSHING, Ordering::Release);
    }

    pub fn is_flushing(&self) -> bool {
        self.0.load(Ordering::Acquire) == FLUSHING
    }
}

/// What one pass over the ring produced
#[derive(Debug)]
pub(crate) enum Fill {
    /// Nothing pending
    Empty,
    /// `block` holds this many whole records
    Block(u64),
    /// A single record larger than a block, to be written on its own
    Oversized(Item),
}

/// Drain records into `block` until it would overflow.
///
/// Starts with `carry` if set. A record that does not fit is left in `carry`.
/// Drained records go back to `pool` once copied.
pub(crate) fn fill_block(
    reader: &mut RingReader,
    pool: &ItemPool,
    block: &mut BytesMut,
    carry: &mut Option<Item>,
) -> Fill {
    block.clear();
    let mut records = 0u64;

    while let Some(item) = carry.take().or_else(|| reader.next()) {
        if block.len() + item.len() > BLOCK_SIZE {
            if block.is_empty() {
                return Fill::Oversized(item);
            }
            *carry = Some(item);
            break;
        }

        block.extend_from_slice(item.bytes());
        pool.put(item);
        records += 1;
    }

    if records == 0 {
        Fill::Empty
    } else {
        Fill::Block(records)
    }
}

/// Background task owning the ring's reader
pub(crate) async fn run_flush_task(core: Arc<Core>, mut reader: RingReader, tick: Duration) {
    // fires on return, panic or abort so every `close()` caller wakes
    let _finished = core.finished.clone().drop_guard();

    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut block = BytesMut::with_capacity(BLOCK_SIZE);
    let mut carry: Option<Item> = None;

    loop {
        tokio::select! {
            _ = core.shutdown.cancelled() => break,
            _ = core.flush_wanted.notified() => {}
            _ = ticker.tick() => {
                // a triggered cycle already holds the guard; its permit is queued
                if !core.state.try_begin() {
                    continue;
                }
            }
        }

        core.flush_cycle(&mut reader, &mut block, &mut carry);
        core.state.finish();

        if carry.is_some() || core.pending() > core.trigger() {
            core.request_flush();
        }
    }

    core.state.force();
    while core.pending() > 0 {
        if core.flush_cycle(&mut reader, &mut block, &mut carry) == 0 {
            // a producer claimed a slot but has not published yet
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
    core.close_output();
    core.state.finish();

    tracing::debug!("ringlog flush task finished");
}
