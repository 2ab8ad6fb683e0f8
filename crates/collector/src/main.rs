//! Collector - UDP log collector
//!
//! Ingests datagram-delimited log lines over UDP, buffers them in a
//! bounded queue, and appends them to a size-rotated log file. Exposes
//! `/metrics` and `/health` over HTTP and shuts down cleanly on
//! SIGINT/SIGTERM.
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (UDP :9000, metrics 127.0.0.1:9100, collector.log)
//! collector
//!
//! # Run with a config file
//! collector --config configs/collector.toml
//! ```
//!
//! # Exit codes
//!
//! - 0 - clean shutdown after a termination signal
//! - 1 - fatal runtime failure (bind, sink open, write error)
//! - 2 - configuration or argument error

mod serve;
mod shutdown;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use logcollector_config::{Config, ConfigError};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Config path used when none is given; missing is fine, defaults apply
const DEFAULT_CONFIG_PATH: &str = "configs/collector.toml";

/// Collector - UDP log collector
#[derive(Parser, Debug)]
#[command(name = "collector")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("collector: {e}");
            return ExitCode::from(2);
        }
    };

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or_else(|| config.log.level.as_str());
    if let Err(e) = init_logging(level) {
        eprintln!("collector: {e}");
        return ExitCode::from(2);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("collector: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve::run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Load the configuration file
///
/// The default path is allowed to be absent - the collector then runs on
/// built-in defaults. An explicitly requested file must exist.
fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
        return Ok(Config::default());
    }
    Config::load(path)
}

/// Initialize the tracing subscriber
///
/// Logs go to stderr so piped stdout stays clean.
fn init_logging(level: &str) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_new(level)
        .map_err(|e| ConfigError::invalid_value("log.level", e.to_string()))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();

    Ok(())
}
