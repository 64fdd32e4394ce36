//! Ringlog - asynchronous batching log sink
//!
//! # Usage
//!
//! ```bash
//! # Copy stdin into logs/app.log through a 4096-slot ring
//! some-service | ringlog pipe --name logs/app --capacity 4096
//!
//! # Hammer a writer from 8 threads and report what was kept
//! ringlog stress --producers 8 --records 100000 --size 200 --name /tmp/stress
//!
//! # Settings from a file, overridden per flag
//! ringlog --config configs/ringlog.toml pipe
//! ```

mod cmd;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ringlog_config::{Config, DEFAULT_FILTER, LogConfig, LogFormat, LogOutput};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Ringlog - asynchronous batching log sink
#[derive(Parser, Debug)]
#[command(name = "ringlog")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (all defaults if omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (e.g. debug, or info,ringlog_sink=trace); overrides [log].filter
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy stdin line by line into the writer
    Pipe(cmd::pipe::PipeArgs),

    /// Write synthetic records from many threads and report statistics
    Stress(cmd::stress::StressArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    init_logging(&config.log, cli.log_level.as_deref())?;

    match cli.command {
        Command::Pipe(args) => cmd::pipe::run(args, &config).await,
        Command::Stress(args) => cmd::stress::run(args, &config).await,
    }
}

/// Initialize the tracing subscriber for the tool's own diagnostics
fn init_logging(config: &LogConfig, level_override: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_new(config.directive(level_override))
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .map_err(|e| anyhow::anyhow!("invalid log filter: {}", e))?;

    let layer = match (config.format, config.output) {
        (LogFormat::Console, LogOutput::Stderr) => fmt::layer()
            .with_ansi(config.ansi)
            .with_writer(io::stderr)
            .boxed(),
        (LogFormat::Console, LogOutput::Stdout) => fmt::layer()
            .with_ansi(config.ansi)
            .with_writer(io::stdout)
            .boxed(),
        (LogFormat::Json, LogOutput::Stderr) => fmt::layer().json().with_writer(io::stderr).boxed(),
        (LogFormat::Json, LogOutput::Stdout) => fmt::layer().json().with_writer(io::stdout).boxed(),
    };

    tracing_subscriber::registry().with(layer).with(filter).init();

    Ok(())
}
