//! Size-based file rotation
//!
//! The live file is `<name>.log`. Once the bytes written to it exceed the
//! configured maximum it is synced, closed, renamed to
//! `<name>_<YYYY-MM-DD_HH-MM-SS>.log` and a fresh live file is opened.
//!
//! Failures never stop the sink:
//!
//! - rename fails: the live file is reopened and writing continues there;
//!   it is already over the limit, so the next write retries the rotation
//! - reopen fails: output falls back to stdout until a later
//!   [`RotationPolicy::reopen_if_degraded`] succeeds
//!
//! Two rotations within the same second produce the same archive name; on
//! Unix the second rename replaces the first archive.
//!
//! This type never logs. It runs under the writer's output lock, and the
//! writer may itself be the destination of the process's `tracing`
//! subscriber, so outcomes are returned for the caller to report.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::{Result, SinkError};

/// Archive timestamp format (second resolution)
pub const ARCHIVE_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Path of the live file for a base name
pub fn live_path(name: &str) -> PathBuf {
    PathBuf::from(format!("{name}.log"))
}

/// Path a live file is renamed to when rotated at `at`
pub fn archive_path(name: &str, at: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!("{name}_{}.log", at.format(ARCHIVE_TIME_FORMAT)))
}

/// Where bytes currently go
#[derive(Debug)]
pub enum Output {
    File(File),
    Stdout,
    Closed,
}

impl Output {
    /// Write the whole buffer in one call
    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Output::File(file) => file.write_all(buf),
            Output::Stdout => io::stdout().lock().write_all(buf),
            Output::Closed => Err(SinkError::Closed.into()),
        }
    }

    /// Durability sync (flush for stdout)
    pub fn sync(&mut self) -> io::Result<()> {
        match self {
            Output::File(file) => file.sync_data(),
            Output::Stdout => io::stdout().lock().flush(),
            Output::Closed => Ok(()),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Output::File(_))
    }
}

/// Outcome of one rotation attempt
#[derive(Debug)]
pub struct Rotation {
    /// Name the live file was (or would have been) archived under
    pub archive: PathBuf,

    /// Result of the final sync of the outgoing live file
    pub synced: io::Result<()>,

    /// Result of renaming the live file to `archive`
    pub renamed: io::Result<()>,

    /// Result of opening the new live file; on error output is stdout
    pub reopened: io::Result<()>,
}

impl Rotation {
    pub fn is_ok(&self) -> bool {
        self.synced.is_ok() && self.renamed.is_ok() && self.reopened.is_ok()
    }
}

/// Owns the active output and decides when to rotate it
#[derive(Debug)]
pub struct RotationPolicy {
    /// Base name; `None` when writing to stdout by configuration
    name: Option<String>,
    live: Option<PathBuf>,
    output: Output,

    /// Bytes in the current live file
    cur: u64,
    max: u64,

    /// Fell back to stdout after a failed reopen
    degraded: bool,
}

impl RotationPolicy {
    /// Open (or append to) `<name>.log`, creating parent directories.
    pub fn open(name: &str, max: u64) -> Result<Self> {
        let live = live_path(name);
        if let Some(parent) = live.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| SinkError::io(parent, e))?;
        }

        let (file, cur) = open_live(&live).map_err(|e| SinkError::io(&live, e))?;

        Ok(Self {
            name: Some(name.to_string()),
            live: Some(live),
            output: Output::File(file),
            cur,
            max,
            degraded: false,
        })
    }

    /// Write to stdout; never rotates
    pub fn stdout() -> Self {
        Self {
            name: None,
            live: None,
            output: Output::Stdout,
            cur: 0,
            max: u64::MAX,
            degraded: false,
        }
    }

    /// Write a block and sync it
    pub fn write_block(&mut self, buf: &[u8]) -> io::Result<()> {
        self.output.write_all(buf)?;
        self.output.sync()
    }

    /// Write without syncing (direct mode)
    pub fn write_through(&mut self, buf: &[u8]) -> io::Result<()> {
        self.output.write_all(buf)
    }

    /// Account for bytes just written and rotate if over the limit
    pub fn record(&mut self, written: u64) -> Option<Rotation> {
        self.cur = self.cur.saturating_add(written);
        if self.cur > self.max && self.live.is_some() && !self.degraded {
            self.rotate_at(Local::now())
        } else {
            None
        }
    }

    /// Rotate now, stamping the archive with `at`. `None` for stdout output.
    pub fn rotate_at(&mut self, at: DateTime<Local>) -> Option<Rotation> {
        let (Some(name), Some(live)) = (self.name.as_deref(), self.live.clone()) else {
            return None;
        };
        let archive = archive_path(name, at);

        let synced = match std::mem::replace(&mut self.output, Output::Stdout) {
            Output::File(file) => file.sync_all(),
            _ => Ok(()),
        };

        let renamed = fs::rename(&live, &archive);

        let reopened = match open_live(&live) {
            Ok((file, size)) => {
                self.output = Output::File(file);
                self.cur = size;
                Ok(())
            }
            Err(e) => {
                self.output = Output::Stdout;
                self.cur = 0;
                self.degraded = true;
                Err(e)
            }
        };

        Some(Rotation {
            archive,
            synced,
            renamed,
            reopened,
        })
    }

    /// Try to get back onto the live file after falling back to stdout
    pub fn reopen_if_degraded(&mut self) -> Option<io::Result<()>> {
        if !self.degraded {
            return None;
        }
        let live = self.live.as_ref()?;

        Some(open_live(live).map(|(file, size)| {
            self.output = Output::File(file);
            self.cur = size;
            self.degraded = false;
        }))
    }

    /// Sync and close; later writes fail with [`SinkError::Closed`]
    pub fn close(&mut self) -> io::Result<()> {
        let result = self.output.sync();
        self.output = Output::Closed;
        result
    }

    /// Bytes written to the current live file
    pub fn current_size(&self) -> u64 {
        self.cur
    }

    pub fn max_size(&self) -> u64 {
        self.max
    }

    pub fn live_path(&self) -> Option<&Path> {
        self.live.as_deref()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn output(&self) -> &Output {
        &self.output
    }
}

fn open_live(path: &Path) -> io::Result<(File, u64)> {
    let file = File::options().create(true).append(true).open(path)?;
    let size = file.metadata()?.len();
    Ok((file, size))
}

#[cfg(test)]
#[path = "rotation_test.rs"]
mod rotation_test;
