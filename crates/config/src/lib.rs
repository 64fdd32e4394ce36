//! Ringlog Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! An empty file is a valid config: unbuffered output to stdout.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use ringlog_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[writer]\nname = \"logs/app\"").unwrap();
//! assert_eq!(config.writer.name, "logs/app");
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [writer]
//! name = "logs/app"
//! max_size = 67108864
//! capacity = 4096
//! tick = "1s"
//! ```

mod error;
mod logging;
mod writer;

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

pub use error::{ConfigError, Result};
pub use logging::{DEFAULT_FILTER, LogConfig, LogFormat, LogOutput};
pub use writer::{MAX_CAPACITY, WriterSection};

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The tool's own logging
    pub log: LogConfig,

    /// Writer options
    pub writer: WriterSection,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.log.validate()?;
        self.writer.validate()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
