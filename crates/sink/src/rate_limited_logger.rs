//! Rate-limited diagnostics
//!
//! A full disk fails every flush; an overloaded ring drops every insert. This
//! keeps the sink's own `tracing` output to at most one line per interval per
//! concern, carrying the number of occurrences that were folded into it.
//!
//! The time check happens before the event is emitted, so if the writer is
//! the destination of the active subscriber, a nested failure caused by the
//! emitted line itself is suppressed instead of recursing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between emitted lines
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Emits at most one line per interval, counting the rest
pub struct RateLimitedLogger {
    min_interval: Duration,
    last_log_time: Mutex<Option<Instant>>,

    /// Occurrences since the last emitted line
    pending: AtomicU64,

    /// Occurrences ever recorded
    total: AtomicU64,
}

impl RateLimitedLogger {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_log_time: Mutex::new(None),
            pending: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Count one occurrence; returns `(folded, total)` when a line is due
    fn record(&self) -> Option<(u64, u64)> {
        self.pending.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);

        let due = {
            let mut last = self.last_log_time.lock();
            let now = Instant::now();
            match *last {
                Some(at) if now.duration_since(at) < self.min_interval => false,
                _ => {
                    *last = Some(now);
                    true
                }
            }
        };

        due.then(|| {
            let folded = self.pending.swap(0, Ordering::Relaxed);
            (folded, self.total.load(Ordering::Relaxed))
        })
    }

    /// Record a failure; returns true if it was emitted
    pub fn error(&self, message: &str, error: &dyn std::fmt::Display) -> bool {
        match self.record() {
            Some((folded, total)) => {
                tracing::error!(
                    context = %message,
                    error = %error,
                    suppressed_count = folded - 1,
                    total_errors = total,
                    "ringlog sink error"
                );
                true
            }
            None => false,
        }
    }

    /// Record a dropped record; returns true if it was emitted
    pub fn dropped(&self, attempts: usize) -> bool {
        match self.record() {
            Some((folded, total)) => {
                tracing::warn!(
                    attempts,
                    dropped = folded,
                    total_dropped = total,
                    "ring full, records dropped"
                );
                true
            }
            None => false,
        }
    }

    /// Occurrences since the last emitted line
    pub fn pending_count(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

impl Default for RateLimitedLogger {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_INTERVAL)
    }
}
