//! Writer statistics
//!
//! Counters are atomics updated on the hot path; [`WriterStats`] is the
//! serializable snapshot handed to monitoring.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Default)]
pub(crate) struct WriterMetrics {
    pub writes_total: AtomicU64,
    pub bytes_total: AtomicU64,
    pub flushed_records: AtomicU64,
    pub flushed_bytes: AtomicU64,
    pub dropped: AtomicU64,
    pub flushes: AtomicU64,
    pub rotations: AtomicU64,
    pub write_errors: AtomicU64,
}

impl WriterMetrics {
    #[inline]
    pub fn record_offered(&self, bytes: usize) {
        self.writes_total.fetch_add(1, Ordering::Relaxed);
        self.bytes_total.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_written(&self, records: u64, bytes: usize) {
        self.flushed_records.fetch_add(records, Ordering::Relaxed);
        self.flushed_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, pending: u64, capacity: u64) -> WriterStats {
        WriterStats {
            pending,
            capacity,
            writes_total: self.writes_total.load(Ordering::Relaxed),
            bytes_total: self.bytes_total.load(Ordering::Relaxed),
            flushed_records: self.flushed_records.load(Ordering::Relaxed),
            flushed_bytes: self.flushed_bytes.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a writer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriterStats {
    /// Records accepted but not yet written
    pub pending: u64,

    /// Ring slots (0 in direct mode)
    pub capacity: u64,

    /// `write()` calls
    pub writes_total: u64,

    /// Bytes passed to `write()`
    pub bytes_total: u64,

    /// Records that reached the output
    pub flushed_records: u64,

    /// Bytes that reached the output
    pub flushed_bytes: u64,

    /// Records dropped because the ring was full
    pub dropped: u64,

    /// Block writes performed
    pub flushes: u64,

    /// Successful rotations
    pub rotations: u64,

    /// Failed writes (bytes lost in buffered mode)
    pub write_errors: u64,
}

impl WriterStats {
    /// Serialize for external monitoring
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
