//! Writer configuration
//!
//! Mirrors the sink's writer options as a `[writer]` table. Every field is
//! optional; an empty section writes unbuffered to stdout.
//!
//! # Defaults
//!
//! - `name`: "" (stdout)
//! - `max_size`: 2^61 bytes (never rotate in practice)
//! - `capacity`: 0 (direct mode)
//! - `max_retries`: 8
//! - `tick`: 1s
//! - `debug`: false

use serde::Deserialize;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Largest ring capacity accepted
pub const MAX_CAPACITY: usize = 1 << 30;

/// Writer section
///
/// # Example
///
/// ```toml
/// [writer]
/// name = "logs/app"
/// max_size = 67108864
/// capacity = 4096
/// max_retries = 8
/// tick = "1s"
/// debug = false
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WriterSection {
    /// Base log name; the live file is `<name>.log`
    pub name: String,

    /// Rotate once the live file exceeds this many bytes
    pub max_size: u64,

    /// Ring capacity (rounded up to a power of two); 0 writes directly
    pub capacity: usize,

    /// Insert retries before a record is dropped
    pub max_retries: usize,

    /// Periodic flush interval
    #[serde(with = "humantime_serde")]
    pub tick: Duration,

    /// Echo everything written to stdout
    pub debug: bool,
}

impl Default for WriterSection {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_size: 1 << 61,
            capacity: 0,
            max_retries: 8,
            tick: Duration::from_secs(1),
            debug: false,
        }
    }
}

impl WriterSection {
    /// Buffered through a ring and background flush
    pub fn is_buffered(&self) -> bool {
        !self.name.is_empty() && self.capacity > 0
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(ConfigError::invalid_value(
                "writer",
                "max_size",
                "must be greater than zero",
            ));
        }
        if self.capacity > MAX_CAPACITY {
            return Err(ConfigError::invalid_value(
                "writer",
                "capacity",
                format!("must not exceed {MAX_CAPACITY}"),
            ));
        }
        if self.is_buffered() && self.tick.is_zero() {
            return Err(ConfigError::invalid_value(
                "writer",
                "tick",
                "must be non-zero when capacity is set",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_section() {
        let section = WriterSection::default();
        assert_eq!(section.name, "");
        assert_eq!(section.max_size, 1 << 61);
        assert_eq!(section.capacity, 0);
        assert_eq!(section.max_retries, 8);
        assert_eq!(section.tick, Duration::from_secs(1));
        assert!(!section.debug);
        assert!(!section.is_buffered());
    }

    #[test]
    fn test_deserialize_empty() {
        let section: WriterSection = toml::from_str("").unwrap();
        assert_eq!(section, WriterSection::default());
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
name = "logs/app"
max_size = 1048576
capacity = 128
max_retries = 3
tick = "250ms"
debug = true
"#;
        let section: WriterSection = toml::from_str(toml).unwrap();
        assert_eq!(section.name, "logs/app");
        assert_eq!(section.max_size, 1_048_576);
        assert_eq!(section.capacity, 128);
        assert_eq!(section.max_retries, 3);
        assert_eq!(section.tick, Duration::from_millis(250));
        assert!(section.debug);
        assert!(section.is_buffered());
    }

    #[test]
    fn test_tick_variants() {
        for (s, expected) in [
            ("100ms", Duration::from_millis(100)),
            ("1s", Duration::from_secs(1)),
            ("2m", Duration::from_secs(120)),
        ] {
            let section: WriterSection = toml::from_str(&format!("tick = \"{s}\"")).unwrap();
            assert_eq!(section.tick, expected, "failed for {s}");
        }
    }

    #[test]
    fn test_validate() {
        assert!(WriterSection::default().validate().is_ok());

        let zero_size = WriterSection {
            max_size: 0,
            ..Default::default()
        };
        assert!(zero_size.validate().is_err());

        let zero_tick = WriterSection {
            name: "app".into(),
            capacity: 16,
            tick: Duration::ZERO,
            ..Default::default()
        };
        let err = zero_tick.validate().unwrap_err();
        assert!(err.to_string().contains("tick"));

        // zero tick is irrelevant in direct mode
        let direct = WriterSection {
            tick: Duration::ZERO,
            ..Default::default()
        };
        assert!(direct.validate().is_ok());

        let huge = WriterSection {
            capacity: MAX_CAPACITY + 1,
            ..Default::default()
        };
        assert!(huge.validate().is_err());
    }
}
