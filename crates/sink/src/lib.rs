//! Ringlog - Sink
//!
//! Asynchronous, batching log sink for a structured-logging façade. Producers
//! hand over serialized records through `write()` and return immediately; a
//! background task batches them into blocks, writes and syncs each block, and
//! rotates the file by size.
//!
//! # Architecture
//!
//! ```text
//! [producers] --write()--> [ItemPool] --> [RingBuffer] --> [flush task] --> [<name>.log]
//!                                                               |
//!                                                   rotate past max_size
//!                                                               v
//!                                                  [<name>_<timestamp>.log]
//! ```
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`pool`] | Reusable record containers |
//! | [`ring`] | Lock-free MPSC ring with bounded retries |
//! | [`rotation`] | Live file, size threshold, rename and reopen |
//! | [`writer`] | Ingestion surface, flush task, shutdown |
//!
//! Overload drops records rather than blocking producers; every drop invokes
//! the configured alert callback and is counted in [`WriterStats`].
//!
//! # Example
//!
//! ```ignore
//! use ringlog_sink::{Writer, WriterConfig};
//! use std::time::Duration;
//!
//! let writer = Writer::new(
//!     WriterConfig::default()
//!         .with_file("logs/app", 64 * 1024 * 1024)
//!         .with_buffer(4096, 8, Duration::from_secs(1))
//!         .with_alert(|attempts| eprintln!("dropped after {attempts} attempts")),
//! )?;
//!
//! tracing_subscriber::fmt().json().with_writer(writer.clone()).init();
//! tracing::info!("started");
//!
//! let stats = writer.close().await;
//! ```

// =============================================================================
// Components
// =============================================================================

/// Reusable record containers
pub mod pool;

/// Lock-free multi-producer / single-consumer ring
pub mod ring;

/// Size-based file rotation
pub mod rotation;

/// Writer, flush task and statistics
pub mod writer;

// =============================================================================
// Shared utilities
// =============================================================================

pub mod error;

/// Rate-limited diagnostics for recurring failures
pub mod rate_limited_logger;

pub use error::{Result, SinkError};
pub use pool::{Item, ItemPool, PoolSnapshot};
pub use ring::{Alerter, RingBuffer, RingReader};
pub use rotation::RotationPolicy;
pub use writer::{
    BLOCK_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_MAX_SIZE, DEFAULT_TICK, Writer, WriterConfig,
    WriterStats,
};
