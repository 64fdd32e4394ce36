//! `[log]` section: the CLI's own diagnostics, not the records it writes
//!
//! ```toml
//! [log]
//! filter = "info,ringlog_sink=debug"
//! format = "json"
//! output = "stderr"
//! ansi = false
//! ```

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Filter used when none is configured
pub const DEFAULT_FILTER: &str = "info";

/// How diagnostic lines are rendered
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    Json,
}

/// Where diagnostic lines go
///
/// Stderr by default: a writer without a name emits records on stdout, and
/// the two streams must not interleave.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive; `level = "debug"` is accepted as well
    #[serde(alias = "level")]
    pub filter: String,

    pub format: LogFormat,
    pub output: LogOutput,

    /// Colored console output
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Directive to install, preferring a command-line override
    pub fn directive<'a>(&'a self, cli_override: Option<&'a str>) -> &'a str {
        cli_override.unwrap_or(&self.filter)
    }

    /// Writing into the same stream as an unnamed writer's records
    pub fn shares_stdout(&self) -> bool {
        self.output == LogOutput::Stdout
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.filter.trim().is_empty() {
            return Err(ConfigError::invalid_value("log", "filter", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_keep_stdout_free() {
        let config = LogConfig::default();
        assert_eq!(config.filter, "info");
        assert!(!config.shares_stdout());
        assert!(config.ansi);
    }

    #[test]
    fn test_level_alias_and_directive() {
        let config: LogConfig = toml::from_str("level = \"debug\"\nansi = false").unwrap();
        assert_eq!(config.filter, "debug");
        assert!(!config.ansi);

        assert_eq!(config.directive(None), "debug");
        assert_eq!(config.directive(Some("ringlog_sink=trace")), "ringlog_sink=trace");
    }

    #[test]
    fn test_blank_filter_rejected() {
        let config: LogConfig = toml::from_str("filter = \"  \"").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "filter", .. })
        ));
    }

    #[test]
    fn test_unknown_output_rejected() {
        assert!(toml::from_str::<LogConfig>("output = \"syslog\"").is_err());
    }
}
