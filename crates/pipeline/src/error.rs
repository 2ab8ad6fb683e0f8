//! Pipeline error types

use logcollector_sinks::SinkError;
use thiserror::Error;

/// Errors that terminate the writer
///
/// All of these are fatal for the process: the writer is the only path
/// to disk, so losing it means losing ingestion.
#[derive(Debug, Error)]
pub enum WriterError {
    /// The sink failed to open or write
    #[error("sink failure: {0}")]
    Sink(#[from] SinkError),

    /// The writer task ended without running to completion
    #[error("writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_error_display() {
        let err = WriterError::from(SinkError::InvalidConfig("max_bytes must be > 0"));
        assert!(err.to_string().contains("sink failure"));
        assert!(err.to_string().contains("max_bytes"));
    }
}
