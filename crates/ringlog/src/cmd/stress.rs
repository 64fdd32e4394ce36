//! Stress command - concurrent producers against one writer
//!
//! Every producer is a plain OS thread calling `write()` in a tight loop, so
//! the ring sees real contention. Reports throughput, drops and the writer's
//! final statistics.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use ringlog_config::Config;
use ringlog_sink::Writer;
use tracing::info;

use super::{WriterArgs, writer_config};

/// Stress command arguments
#[derive(Args, Debug)]
pub struct StressArgs {
    /// Producer threads
    #[arg(long, default_value_t = 4)]
    pub producers: usize,

    /// Records per producer
    #[arg(long, default_value_t = 100_000)]
    pub records: usize,

    /// Bytes per record, newline included
    #[arg(long, default_value_t = 128)]
    pub size: usize,

    #[command(flatten)]
    pub writer: WriterArgs,
}

/// Run the stress command
pub async fn run(args: StressArgs, config: &Config) -> Result<()> {
    let section = args.writer.resolve(&config.writer);
    let alerts = Arc::new(AtomicU64::new(0));
    let writer = Writer::new(writer_config(&section, Arc::clone(&alerts)))
        .context("failed to start writer")?;

    info!(
        producers = args.producers,
        records = args.records,
        size = args.size,
        buffered = writer.is_buffered(),
        "stress run starting"
    );

    let started = Instant::now();
    let producers = args.producers.max(1);
    let records = args.records;
    let size = args.size;
    let produce_writer = writer.clone();
    tokio::task::spawn_blocking(move || produce(&produce_writer, producers, records, size))
        .await
        .context("producer threads panicked")??;
    let produced_in = started.elapsed();

    let stats = writer.close().await;
    let total = started.elapsed();

    let offered = (producers * records) as f64;
    info!(
        produce_ms = produced_in.as_millis() as u64,
        total_ms = total.as_millis() as u64,
        records_per_sec = (offered / produced_in.as_secs_f64().max(f64::EPSILON)) as u64,
        dropped = stats.dropped,
        alerts = alerts.load(Ordering::Relaxed),
        "stress run finished"
    );

    eprintln!("{}", stats.to_json()?);
    Ok(())
}

/// Run `producers` threads writing `records` records each
pub fn produce(writer: &Writer, producers: usize, records: usize, size: usize) -> Result<()> {
    thread::scope(|scope| {
        let handles: Vec<_> = (0..producers)
            .map(|p| {
                scope.spawn(move || -> Result<()> {
                    let mut line = Vec::with_capacity(size.max(1));
                    for i in 0..records {
                        fill_record(&mut line, p, i, size);
                        writer.write(&line).context("write failed")?;
                    }
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("producer thread panicked"))??;
        }
        Ok(())
    })
}

/// A JSON-looking record padded to `size` bytes, ending in a newline
pub fn fill_record(buf: &mut Vec<u8>, producer: usize, seq: usize, size: usize) {
    buf.clear();
    buf.extend_from_slice(format!("{{\"producer\":{producer},\"seq\":{seq},\"pad\":\"").as_bytes());
    let closing = b"\"}\n";
    let target = size.max(buf.len() + closing.len());
    buf.resize(target - closing.len(), b'.');
    buf.extend_from_slice(closing);
}
