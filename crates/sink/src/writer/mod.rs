//! Writer - the ingestion surface of the sink
//!
//! `write()` is the only call a logging façade needs. Two modes:
//!
//! - **direct** (empty name, or capacity 0): the caller writes straight to
//!   the output under a lock and sees any I/O error
//! - **buffered**: the record is copied into a pooled item and pushed into the
//!   ring; a background task batches records into blocks of at most
//!   [`BLOCK_SIZE`] bytes, writes, syncs and rotates. Producers never block
//!   and never see I/O errors.
//!
//! ```text
//! [producers] ──write()──► [ItemPool] ──► [RingBuffer] ──► [flush task] ──► [<name>.log]
//!                              ▲                                 │
//!                              └──────── drained items ──────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ringlog_sink::{Writer, WriterConfig};
//! use std::time::Duration;
//!
//! let config = WriterConfig::default()
//!     .with_file("logs/app", 64 * 1024 * 1024)
//!     .with_buffer(4096, 8, Duration::from_secs(1));
//! let writer = Writer::new(config)?;
//!
//! writer.write(b"{\"m\":\"started\"}\n")?;
//! let stats = writer.close().await;
//! ```

mod config;
mod flush;
mod stats;

use std::io::{self, Write as _};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::BytesMut;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::MakeWriter;

pub use config::{BLOCK_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_MAX_SIZE, DEFAULT_TICK, WriterConfig};
pub use stats::WriterStats;

use crate::error::{Result, SinkError};
use crate::pool::{Item, ItemPool, PoolSnapshot};
use crate::rate_limited_logger::RateLimitedLogger;
use crate::ring::{RingBuffer, RingReader};
use crate::rotation::{Rotation, RotationPolicy};
use flush::{Fill, FlushState, fill_block, run_flush_task};
use stats::WriterMetrics;

/// Ring, pool and trigger, present only in buffered mode
struct Buffer {
    ring: Arc<RingBuffer>,
    pool: ItemPool,
    trigger: u64,
}

/// State shared between producers and the flush task
pub(crate) struct Core {
    buffer: Option<Buffer>,
    output: Mutex<RotationPolicy>,

    /// Records accepted and not yet written (ring plus carried)
    pending: AtomicU64,

    /// Set before `shutdown` fires; producers check it after counting
    /// themselves into `pending`
    closed: AtomicBool,

    state: FlushState,
    flush_wanted: Notify,
    shutdown: CancellationToken,

    /// Cancelled once the flush task has drained and closed the output
    finished: CancellationToken,

    /// Copy of every write when `debug` is set
    echo: Option<Mutex<Box<dyn io::Write + Send>>>,
    metrics: WriterMetrics,
    write_errors: RateLimitedLogger,
    rotation_errors: RateLimitedLogger,
    drops: RateLimitedLogger,
}

impl Core {
    #[inline]
    fn pending(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }

    #[inline]
    fn trigger(&self) -> u64 {
        self.buffer.as_ref().map_or(0, |b| b.trigger)
    }

    /// Schedule one flush cycle unless one is already running or queued
    #[inline]
    fn request_flush(&self) {
        if self.state.try_begin() {
            self.flush_wanted.notify_one();
        }
    }

    fn ingest(&self, buf: &[u8]) -> io::Result<usize> {
        self.metrics.record_offered(buf.len());

        match &self.buffer {
            Some(buffer) => self.enqueue(buffer, buf),
            None if self.is_closed() => Err(SinkError::Closed.into()),
            None => self.write_direct(buf),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop accepting records and wake the flush task
    fn begin_shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown.cancel();
    }

    fn enqueue(&self, buffer: &Buffer, buf: &[u8]) -> io::Result<usize> {
        // count first, then check: either the shutdown drain sees this
        // record in `pending` or the record sees `closed`
        let pending = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        if self.is_closed() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(SinkError::Closed.into());
        }

        let item = buffer.pool.get(buf);
        match buffer.ring.add(item) {
            Ok(_) => {
                if pending > buffer.trigger {
                    self.request_flush();
                }
            }
            Err(item) => {
                self.pending.fetch_sub(1, Ordering::AcqRel);
                buffer.pool.put(item);
                self.metrics.record_dropped();
                self.drops.dropped(buffer.ring.max_retries() + 1);
            }
        }
        Ok(buf.len())
    }

    fn write_direct(&self, buf: &[u8]) -> io::Result<usize> {
        let (result, rotation, recovered) = {
            let mut output = self.output.lock();
            let recovered = output.reopen_if_degraded();
            let result = output.write_through(buf);
            let rotation = match result {
                Ok(()) => output.record(buf.len() as u64),
                Err(_) => None,
            };
            (result, rotation, recovered)
        };

        self.echo(buf);
        self.report_output_events(rotation, recovered);

        match result {
            Ok(()) => {
                self.metrics.record_written(1, buf.len());
                Ok(buf.len())
            }
            Err(e) => {
                self.metrics.record_error();
                Err(e)
            }
        }
    }

    /// One drain-and-write pass; returns the records taken off the ring
    fn flush_cycle(
        &self,
        reader: &mut RingReader,
        block: &mut BytesMut,
        carry: &mut Option<Item>,
    ) -> u64 {
        let Some(buffer) = &self.buffer else {
            return 0;
        };

        match fill_block(reader, &buffer.pool, block, carry) {
            Fill::Empty => 0,
            Fill::Block(records) => {
                self.emit(block, records);
                records
            }
            Fill::Oversized(item) => {
                self.emit(item.bytes(), 1);
                buffer.pool.put(item);
                1
            }
        }
    }

    /// Write one block, sync it, and account for it
    fn emit(&self, buf: &[u8], records: u64) {
        let (result, rotation, recovered) = {
            let mut output = self.output.lock();
            let recovered = output.reopen_if_degraded();
            let result = output.write_block(buf);
            let rotation = match result {
                Ok(()) => output.record(buf.len() as u64),
                Err(_) => None,
            };
            (result, rotation, recovered)
        };

        self.pending.fetch_sub(records, Ordering::AcqRel);
        self.metrics.record_flush();
        self.echo(buf);

        match result {
            Ok(()) => self.metrics.record_written(records, buf.len()),
            Err(e) => {
                self.metrics.record_error();
                self.write_errors.error("block write failed, records lost", &e);
            }
        }

        self.report_output_events(rotation, recovered);
    }

    fn echo(&self, buf: &[u8]) {
        if let Some(echo) = &self.echo {
            let _ = echo.lock().write_all(buf);
        }
    }

    /// Report rotation outcomes once the output lock is released
    fn report_output_events(&self, rotation: Option<Rotation>, recovered: Option<io::Result<()>>) {
        match recovered {
            Some(Ok(())) => tracing::info!("log file reopened after fallback to stdout"),
            Some(Err(e)) => {
                self.rotation_errors.error("log file still unavailable", &e);
            }
            None => {}
        }

        let Some(rotation) = rotation else {
            return;
        };

        if let Err(e) = &rotation.synced {
            self.rotation_errors.error("sync before rotation failed", e);
        }
        if let Err(e) = &rotation.renamed {
            self.rotation_errors.error("rename during rotation failed", e);
        }
        match &rotation.reopened {
            Ok(()) if rotation.renamed.is_ok() => {
                self.metrics.record_rotation();
                tracing::info!(archive = %rotation.archive.display(), "log file rotated");
            }
            Ok(()) => {}
            Err(e) => {
                self.rotation_errors
                    .error("reopen during rotation failed, writing to stdout", e);
            }
        }
    }

    fn close_output(&self) {
        let result = self.output.lock().close();
        if let Err(e) = result {
            self.write_errors.error("final sync failed", &e);
        }
    }

    fn stats(&self) -> WriterStats {
        let capacity = self.buffer.as_ref().map_or(0, |b| b.ring.slots() as u64);
        self.metrics.snapshot(self.pending(), capacity)
    }
}

struct WriterInner {
    core: Arc<Core>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for WriterInner {
    fn drop(&mut self) {
        // the flush task drains and closes on its own; nobody waits for it
        self.core.begin_shutdown();
    }
}

/// Asynchronous batching log writer
///
/// Cheap to clone; all clones feed the same output. Buffered writers must be
/// created inside a tokio runtime.
#[derive(Clone)]
pub struct Writer {
    inner: Arc<WriterInner>,
}

impl Writer {
    pub fn new(config: WriterConfig) -> Result<Self> {
        config.validate()?;

        let runtime = if config.is_buffered() {
            Some(tokio::runtime::Handle::try_current().map_err(|_| SinkError::NoRuntime)?)
        } else {
            None
        };

        let output = if config.name.is_empty() {
            RotationPolicy::stdout()
        } else {
            RotationPolicy::open(&config.name, config.max_size)?
        };

        let mut reader = None;
        let buffer = if config.is_buffered() {
            let (ring, ring_reader) =
                RingBuffer::with_reader(config.capacity, config.max_retries, config.alert.clone());
            reader = Some(ring_reader);
            Some(Buffer {
                pool: ItemPool::for_ring(ring.slots()),
                trigger: config.trigger_threshold(),
                ring,
            })
        } else {
            None
        };

        let core = Arc::new(Core {
            buffer,
            output: Mutex::new(output),
            pending: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            state: FlushState::default(),
            flush_wanted: Notify::new(),
            shutdown: CancellationToken::new(),
            finished: CancellationToken::new(),
            echo: (config.debug && !config.name.is_empty())
                .then(|| Mutex::new(Box::new(io::stdout()) as Box<dyn io::Write + Send>)),
            metrics: WriterMetrics::default(),
            write_errors: RateLimitedLogger::default(),
            rotation_errors: RateLimitedLogger::default(),
            drops: RateLimitedLogger::default(),
        });

        let task = match (runtime, reader) {
            (Some(runtime), Some(reader)) => {
                Some(runtime.spawn(run_flush_task(Arc::clone(&core), reader, config.tick)))
            }
            _ => None,
        };

        tracing::info!(
            name = %config.name,
            buffered = task.is_some(),
            slots = config.slots(),
            max_size = config.max_size,
            "ringlog writer started"
        );

        Ok(Self {
            inner: Arc::new(WriterInner {
                core,
                task: Mutex::new(task),
            }),
        })
    }

    /// Accept one serialized record.
    ///
    /// Buffered mode always reports the full length, even if the ring was
    /// full and the record dropped. Direct mode returns the I/O result.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.inner.core.ingest(buf)
    }

    /// Drain everything pending, sync and close the output.
    ///
    /// Waits for the flush task to finish, including when another caller
    /// started the close. Calling it again is a no-op.
    pub async fn close(&self) -> WriterStats {
        let core = &self.inner.core;
        core.begin_shutdown();

        let task = self.inner.task.lock().take();
        match task {
            Some(task) => {
                if let Err(e) = task.await {
                    tracing::error!(error = %e, "flush task failed");
                }
            }
            None if core.buffer.is_none() => core.close_output(),
            None => core.finished.cancelled().await,
        }

        let stats = core.stats();
        tracing::info!(
            flushed_records = stats.flushed_records,
            flushed_bytes = stats.flushed_bytes,
            dropped = stats.dropped,
            rotations = stats.rotations,
            "ringlog writer closed"
        );
        stats
    }

    /// Current statistics
    pub fn stats(&self) -> WriterStats {
        self.inner.core.stats()
    }

    /// Statistics as JSON
    pub fn stats_json(&self) -> serde_json::Result<String> {
        self.stats().to_json()
    }

    /// Records accepted but not yet written
    pub fn pending(&self) -> u64 {
        self.inner.core.pending()
    }

    /// Item pool counters (None in direct mode)
    pub fn pool_stats(&self) -> Option<PoolSnapshot> {
        self.inner
            .core
            .buffer
            .as_ref()
            .map(|b| b.pool.metrics().snapshot())
    }

    /// Ring insert attempts that collided (0 in direct mode)
    pub fn collisions(&self) -> u64 {
        self.inner.core.buffer.as_ref().map_or(0, |b| b.ring.collisions())
    }

    pub fn is_buffered(&self) -> bool {
        self.inner.core.buffer.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.core.is_closed()
    }
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.core.ingest(buf)
    }

    /// Requests a flush cycle without waiting for it
    fn flush(&mut self) -> io::Result<()> {
        if self.inner.core.buffer.is_some() {
            self.inner.core.request_flush();
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Writer {
    type Writer = Writer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
