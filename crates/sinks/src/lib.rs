//! Collector sinks
//!
//! Disk-backed destinations for ingested log lines.
//!
//! # Available Sinks
//!
//! - **Rotating file** - append-only text file with size-based rotation
//!   and a bounded set of numbered archives
//!
//! # Design Principles
//!
//! - **Single owner**: a sink is owned by exactly one writer task; no
//!   internal locking
//! - **Write-through**: every line reaches the OS before the call
//!   returns, so a crash loses at most the in-flight line
//! - **Best-effort rotation**: a failed archive rename never halts
//!   ingestion; only open/reopen failures are fatal

pub mod rotating;

pub use rotating::{RotatingFileConfig, RotatingFileSink, SinkError};
