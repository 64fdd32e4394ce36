//! Subcommands and the writer options they share

pub mod pipe;
pub mod stress;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use clap::Args;
use ringlog_config::WriterSection;
use ringlog_sink::WriterConfig;

/// Writer options; each one overrides the `[writer]` section when given
#[derive(Args, Debug, Clone, Default)]
pub struct WriterArgs {
    /// Base log name (`<name>.log`); empty writes to stdout
    #[arg(long)]
    pub name: Option<String>,

    /// Rotate once the live file exceeds this many bytes
    #[arg(long)]
    pub max_size: Option<u64>,

    /// Ring capacity; 0 writes directly
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Insert retries before a record is dropped
    #[arg(long)]
    pub max_retries: Option<usize>,

    /// Periodic flush interval in milliseconds
    #[arg(long)]
    pub tick_ms: Option<u64>,

    /// Echo everything written to stdout
    #[arg(long)]
    pub debug: bool,
}

impl WriterArgs {
    /// Merge flags over the config file section
    pub fn resolve(&self, section: &WriterSection) -> WriterSection {
        WriterSection {
            name: self.name.clone().unwrap_or_else(|| section.name.clone()),
            max_size: self.max_size.unwrap_or(section.max_size),
            capacity: self.capacity.unwrap_or(section.capacity),
            max_retries: self.max_retries.unwrap_or(section.max_retries),
            tick: self.tick_ms.map(Duration::from_millis).unwrap_or(section.tick),
            debug: self.debug || section.debug,
        }
    }
}

/// Build the sink's configuration, counting alerts into `alerts`
pub fn writer_config(section: &WriterSection, alerts: Arc<AtomicU64>) -> WriterConfig {
    let mut config = WriterConfig::default()
        .with_buffer(section.capacity, section.max_retries, section.tick)
        .with_alert(move |_attempts| {
            alerts.fetch_add(1, Ordering::Relaxed);
        });
    if !section.name.is_empty() {
        config = config.with_file(section.name.clone(), section.max_size);
    }
    if section.debug {
        config = config.with_debug();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_section() {
        let section = WriterSection {
            name: "from_file".into(),
            capacity: 64,
            ..Default::default()
        };
        let args = WriterArgs {
            capacity: Some(1024),
            tick_ms: Some(250),
            ..Default::default()
        };

        let resolved = args.resolve(&section);
        assert_eq!(resolved.name, "from_file");
        assert_eq!(resolved.capacity, 1024);
        assert_eq!(resolved.tick, Duration::from_millis(250));
        assert_eq!(resolved.max_retries, 8);
    }

    #[test]
    fn test_writer_config_mapping() {
        let section = WriterSection {
            name: "logs/app".into(),
            max_size: 4096,
            capacity: 100,
            max_retries: 2,
            tick: Duration::from_millis(500),
            debug: true,
        };
        let config = writer_config(&section, Arc::new(AtomicU64::new(0)));

        assert_eq!(config.name, "logs/app");
        assert_eq!(config.max_size, 4096);
        assert_eq!(config.capacity, 100);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.tick, Duration::from_millis(500));
        assert!(config.debug);
        assert!(config.alert.is_some());
        assert!(config.is_buffered());
    }

    #[test]
    fn test_alerts_are_counted() {
        let alerts = Arc::new(AtomicU64::new(0));
        let config = writer_config(&WriterSection::default(), Arc::clone(&alerts));

        if let Some(alert) = &config.alert {
            alert(9);
            alert(9);
        }
        assert_eq!(alerts.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_empty_name_is_stdout() {
        let config = writer_config(&WriterSection::default(), Arc::new(AtomicU64::new(0)));
        assert_eq!(config.name, "");
        assert!(!config.is_buffered());
    }
}
