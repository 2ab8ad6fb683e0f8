//! Collector configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! A minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use logcollector_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("udp_port = 1514").unwrap();
//! assert_eq!(config.udp_port, 1514);
//! ```
//!
//! # Example Full Config
//!
//! ```toml
//! udp_port = 9000
//! metrics_port = 9100
//! bind_ip = "127.0.0.1"
//! out = "collector.log"
//! queue = 10000
//! batch = 256
//! flush_ms = 50
//! rotate_mb = 5
//! rotate_files = 5
//! report_secs = 5
//!
//! [log]
//! level = "info"
//! ```

mod error;
mod logging;

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogLevel};

use serde::Deserialize;

/// Main configuration structure
///
/// All fields are optional in the TOML with defaults matching a
/// localhost deployment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// UDP listen port for log datagrams
    /// Default: 9000
    pub udp_port: u16,

    /// HTTP listen port for the metrics endpoint
    /// Default: 9100
    pub metrics_port: u16,

    /// Bind address for the metrics endpoint
    /// Default: "127.0.0.1"
    pub bind_ip: String,

    /// Path of the live log file
    /// Default: "collector.log"
    pub out: PathBuf,

    /// Queue capacity in items
    /// Default: 10000
    pub queue: usize,

    /// Maximum items the writer pops per batch
    /// Default: 256
    pub batch: usize,

    /// Writer wait bound in milliseconds
    /// Default: 50
    pub flush_ms: u64,

    /// Per-file rotation threshold in MiB
    /// Default: 5
    pub rotate_mb: u64,

    /// Number of archived log files to retain
    /// Default: 5
    pub rotate_files: usize,

    /// Interval of the periodic stats report in seconds (0 disables it)
    /// Default: 5
    pub report_secs: u64,

    /// Logging configuration
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            udp_port: 9000,
            metrics_port: 9100,
            bind_ip: "127.0.0.1".into(),
            out: PathBuf::from("collector.log"),
            queue: 10_000,
            batch: 256,
            flush_ms: 50,
            rotate_mb: 5,
            rotate_files: 5,
            report_secs: 5,
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate semantic constraints the type system cannot express
    pub fn validate(&self) -> Result<()> {
        if self.queue < 1 {
            return Err(ConfigError::invalid_value("queue", "must be at least 1"));
        }
        if self.batch < 1 {
            return Err(ConfigError::invalid_value("batch", "must be at least 1"));
        }
        if self.rotate_mb < 1 {
            return Err(ConfigError::invalid_value("rotate_mb", "must be at least 1"));
        }
        if self.rotate_files < 1 {
            return Err(ConfigError::invalid_value(
                "rotate_files",
                "must be at least 1",
            ));
        }
        if self.out.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value("out", "must not be empty"));
        }
        if self.bind_ip.parse::<IpAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "bind_ip",
                format!("'{}' is not a valid IP address", self.bind_ip),
            ));
        }
        Ok(())
    }

    /// Rotation threshold in bytes
    pub fn rotate_max_bytes(&self) -> u64 {
        self.rotate_mb * 1024 * 1024
    }

    /// Writer wait bound as a `Duration`
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_ms)
    }

    /// Stats report interval, `None` when disabled
    pub fn report_interval(&self) -> Option<Duration> {
        (self.report_secs > 0).then(|| Duration::from_secs(self.report_secs))
    }

    /// Address the metrics endpoint binds to
    pub fn metrics_addr(&self) -> String {
        format!("{}:{}", self.bind_ip, self.metrics_port)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
