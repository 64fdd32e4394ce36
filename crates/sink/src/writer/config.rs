//! Writer configuration

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, SinkError};
use crate::ring::{Alerter, slots_for};

/// Largest block written to the file in one call
pub const BLOCK_SIZE: usize = 8 * 1024;

/// Effectively "never rotate"
pub const DEFAULT_MAX_SIZE: u64 = 1 << 61;

/// Insert attempts beyond the first before a record is dropped
pub const DEFAULT_MAX_RETRIES: usize = 8;

/// Periodic flush interval
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Everything a [`Writer`](super::Writer) needs, with explicit defaults
///
/// | field | default |
/// |---|---|
/// | `name` | `""` (stdout, unbuffered) |
/// | `max_size` | `1 << 61` |
/// | `capacity` | `0` (direct mode) |
/// | `max_retries` | `8` |
/// | `tick` | `1s` |
/// | `debug` | `false` |
/// | `alert` | none |
#[derive(Clone)]
pub struct WriterConfig {
    /// Base log name; the live file is `<name>.log`. Empty writes to stdout.
    pub name: String,

    /// Rotate once the live file grows past this many bytes
    pub max_size: u64,

    /// Ring capacity, rounded up to a power of two. Zero writes directly.
    pub capacity: usize,

    /// Insert retries before a record is dropped
    pub max_retries: usize,

    /// Periodic flush interval
    pub tick: Duration,

    /// Also copy everything written to stdout
    pub debug: bool,

    /// Called with the attempt count whenever a record is dropped
    pub alert: Option<Alerter>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_size: DEFAULT_MAX_SIZE,
            capacity: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            tick: DEFAULT_TICK,
            debug: false,
            alert: None,
        }
    }
}

impl fmt::Debug for WriterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterConfig")
            .field("name", &self.name)
            .field("max_size", &self.max_size)
            .field("capacity", &self.capacity)
            .field("max_retries", &self.max_retries)
            .field("tick", &self.tick)
            .field("debug", &self.debug)
            .field("alert", &self.alert.is_some())
            .finish()
    }
}

impl WriterConfig {
    /// Log to `<name>.log`, rotating past `max_size` bytes
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, max_size: u64) -> Self {
        self.name = name.into();
        self.max_size = max_size;
        self
    }

    /// Buffer through a ring of `capacity` slots, flushing every `tick`
    #[must_use]
    pub fn with_buffer(mut self, capacity: usize, max_retries: usize, tick: Duration) -> Self {
        self.capacity = capacity;
        self.max_retries = max_retries;
        self.tick = tick;
        self
    }

    #[must_use]
    pub fn with_alert(mut self, alert: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.alert = Some(Arc::new(alert));
        self
    }

    #[must_use]
    pub fn with_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Records go through the ring and a background flush task
    pub fn is_buffered(&self) -> bool {
        !self.name.is_empty() && self.capacity > 0
    }

    /// Slot count of the ring (0 in direct mode)
    pub fn slots(&self) -> usize {
        if self.is_buffered() {
            slots_for(self.capacity)
        } else {
            0
        }
    }

    /// Pending count above which a flush is requested
    pub fn trigger_threshold(&self) -> u64 {
        (self.slots() / 2) as u64
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(SinkError::config("max_size must be greater than zero"));
        }
        if self.is_buffered() && self.tick.is_zero() {
            return Err(SinkError::config("tick must be non-zero when buffering"));
        }
        if self.capacity > 1 << 30 {
            return Err(SinkError::config("capacity must not exceed 2^30"));
        }
        Ok(())
    }
}
