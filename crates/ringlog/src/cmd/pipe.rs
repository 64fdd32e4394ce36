//! Pipe command - copy stdin into the writer
//!
//! Each input line (newline included) is one record. Stops at end of input
//! or on Ctrl+C, then drains the writer and prints its statistics as JSON to
//! stderr.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use clap::Args;
use ringlog_config::Config;
use ringlog_sink::Writer;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

use super::{WriterArgs, writer_config};

/// Pipe command arguments
#[derive(Args, Debug)]
pub struct PipeArgs {
    #[command(flatten)]
    pub writer: WriterArgs,
}

/// Run the pipe command
pub async fn run(args: PipeArgs, config: &Config) -> Result<()> {
    let section = args.writer.resolve(&config.writer);
    let alerts = Arc::new(AtomicU64::new(0));
    let writer = Writer::new(writer_config(&section, Arc::clone(&alerts)))
        .context("failed to start writer")?;

    let stdin = BufReader::new(tokio::io::stdin());
    let copied = tokio::select! {
        result = copy_lines(stdin, &writer) => result?,
        _ = signal::ctrl_c() => {
            info!("interrupted, draining");
            0
        }
    };

    let stats = writer.close().await;
    let alerts = alerts.load(Ordering::Relaxed);
    if alerts > 0 {
        warn!(alerts, "records were dropped under load");
    }
    info!(lines = copied, "pipe finished");

    eprintln!("{}", stats.to_json()?);
    Ok(())
}

/// Feed every line of `input` to the writer; returns the number of lines
pub async fn copy_lines<R>(mut input: R, writer: &Writer) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::with_capacity(1024);
    let mut lines = 0u64;

    loop {
        line.clear();
        let n = input
            .read_until(b'\n', &mut line)
            .await
            .context("failed to read input")?;
        if n == 0 {
            break;
        }
        writer.write(&line).context("write failed")?;
        lines += 1;
    }

    Ok(lines)
}
