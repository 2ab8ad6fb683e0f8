//! Rotating file sink
//!
//! Append-only log file with size-based rotation. The live file lives at
//! the configured path; archives are numbered suffixes with `.1` the most
//! recent:
//!
//! ```text
//! collector.log        live
//! collector.log.1      newest archive
//! collector.log.2
//! collector.log.N      oldest archive (deleted on the next rotation)
//! ```
//!
//! Rotation happens *before* a write that would push the live file to or
//! past the byte budget, so a segment never exceeds the budget by more
//! than one line. Archive renames are best-effort; a permission or
//! filesystem glitch on one slot is skipped rather than halting ingestion.
//!
//! Every line hits the file handle directly (no userspace buffer), so an
//! unexpected exit loses at most the line being written.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Rotating file sink configuration
#[derive(Debug, Clone)]
pub struct RotatingFileConfig {
    /// Path of the live log file
    pub path: PathBuf,

    /// Byte budget per file; a write reaching this triggers rotation first
    pub max_bytes: u64,

    /// Number of archive slots to retain
    pub max_files: usize,
}

impl RotatingFileConfig {
    /// Create a config with the given path and default limits (5 MiB, 5 archives)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: 5 * 1024 * 1024,
            max_files: 5,
        }
    }
}

/// Sink errors
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Failed to open or reopen the live file
    #[error("failed to open log file '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Write failure on the live file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rejected configuration
    #[error("invalid sink config: {0}")]
    InvalidConfig(&'static str),
}

/// Append-only file writer with size-based rotation
///
/// Owned by a single writer task; not internally synchronized.
#[derive(Debug)]
pub struct RotatingFileSink {
    config: RotatingFileConfig,

    /// Live file handle; `None` only transiently during rotation
    out: Option<File>,

    /// This process's belief about the live file's on-disk size
    bytes_written: u64,
}

impl RotatingFileSink {
    /// Open (or create) the live file in append mode
    ///
    /// `bytes_written` starts at the existing file size, so the first
    /// rotation threshold accounts for content from a previous run.
    pub fn open(config: RotatingFileConfig) -> Result<Self, SinkError> {
        if config.max_bytes == 0 {
            return Err(SinkError::InvalidConfig("max_bytes must be > 0"));
        }
        if config.max_files < 1 {
            return Err(SinkError::InvalidConfig("max_files must be >= 1"));
        }

        let mut sink = Self {
            config,
            out: None,
            bytes_written: 0,
        };
        sink.open_if_needed()?;
        Ok(sink)
    }

    /// Append one line, ensuring exactly one trailing newline
    ///
    /// Rotates first when the write would reach the byte budget.
    pub fn write_line(&mut self, line: &[u8]) -> Result<(), SinkError> {
        self.open_if_needed()?;

        let needs_newline = !line.ends_with(b"\n");
        let add = line.len() as u64 + u64::from(needs_newline);

        if self.bytes_written + add >= self.config.max_bytes {
            self.rotate()?;
        }

        let Some(out) = self.out.as_mut() else {
            // rotate()/open_if_needed() always leave a live handle behind.
            return Err(SinkError::Open {
                path: self.config.path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "live handle missing"),
            });
        };

        out.write_all(line)?;
        if needs_newline {
            out.write_all(b"\n")?;
        }
        self.bytes_written += add;

        Ok(())
    }

    /// Size the sink believes the live file has
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Path of the live file
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Open the live file if no handle is held
    fn open_if_needed(&mut self) -> Result<(), SinkError> {
        if self.out.is_some() {
            return Ok(());
        }

        let file = File::options()
            .create(true)
            .append(true)
            .open(&self.config.path)
            .map_err(|source| SinkError::Open {
                path: self.config.path.display().to_string(),
                source,
            })?;

        // Track prior content if the file already exists.
        self.bytes_written = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.out = Some(file);

        Ok(())
    }

    /// Rotate the archive set and reopen a fresh live file
    fn rotate(&mut self) -> Result<(), SinkError> {
        // Flush and close the live handle so the rename moves a quiesced file.
        if let Some(mut out) = self.out.take() {
            let _ = out.flush();
        }

        shift_archives(&self.config.path, self.config.max_files);
        self.open_if_needed()?;

        tracing::debug!(
            path = %self.config.path.display(),
            max_files = self.config.max_files,
            "rotated log file"
        );

        Ok(())
    }
}

/// Shift the archive chain by one slot
///
/// Deletes `P.N`, renames `P.i` to `P.(i+1)` for `i = N-1 .. 1`, then
/// moves the live file to `P.1`. Each step is best-effort.
fn shift_archives(path: &Path, max_files: usize) {
    let oldest = archive_path(path, max_files);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for i in (1..max_files).rev() {
        let from = archive_path(path, i);
        if from.exists() {
            let _ = fs::rename(&from, archive_path(path, i + 1));
        }
    }

    if path.exists() {
        let _ = fs::rename(path, archive_path(path, 1));
    }
}

/// Path of archive slot `index` (`collector.log` -> `collector.log.3`)
fn archive_path(path: &Path, index: usize) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{index}"));
    PathBuf::from(name)
}
