//! Log writer
//!
//! Owns the rotating sink on a dedicated task. Pulls batches from the
//! queue with a bounded wait, so lines reach disk within roughly the
//! flush interval even at trickle rates, while bursts amortize into
//! batched writes.
//!
//! The writer exits when the queue is closed *and* empty, which is the
//! drain-on-shutdown guarantee: every line accepted before `close()` is
//! on disk by the time the task finishes. Closing the queue is the
//! caller's job (see the shutdown sequence in the collector binary);
//! popping an empty closed queue returns promptly, so exit latency after
//! close is at most one flush interval.

use std::sync::Arc;
use std::time::Duration;

use logcollector_metrics::Stats;
use logcollector_sinks::{RotatingFileConfig, RotatingFileSink};
use tokio::task::JoinHandle;

use crate::error::WriterError;
use crate::queue::LogQueue;

/// Writer configuration
#[derive(Debug, Clone)]
pub struct LogWriterConfig {
    /// Sink configuration (path, rotation limits)
    pub sink: RotatingFileConfig,

    /// Maximum items drained per pop
    pub batch_size: usize,

    /// Upper bound on the wait for a batch
    pub flush_interval: Duration,
}

impl LogWriterConfig {
    /// Create a config with the given sink and default batching (256 / 50ms)
    pub fn new(sink: RotatingFileConfig) -> Self {
        Self {
            sink,
            batch_size: 256,
            flush_interval: Duration::from_millis(50),
        }
    }
}

/// Queue-to-disk writer
pub struct LogWriter {
    queue: Arc<LogQueue>,
    stats: Arc<Stats>,
    config: LogWriterConfig,
}

impl LogWriter {
    /// Create a new writer
    pub fn new(queue: Arc<LogQueue>, stats: Arc<Stats>, config: LogWriterConfig) -> Self {
        Self {
            queue,
            stats,
            config,
        }
    }

    /// Spawn the writer task
    ///
    /// The sink is constructed inside the task; an open failure surfaces
    /// through [`WriterHandle::stop`] (or by polling the handle).
    pub fn start(self) -> WriterHandle {
        let queue = Arc::clone(&self.queue);
        let task = tokio::spawn(self.run());
        WriterHandle { queue, task }
    }

    async fn run(self) -> Result<(), WriterError> {
        let mut sink = RotatingFileSink::open(self.config.sink.clone())?;

        tracing::info!(
            path = %sink.path().display(),
            batch_size = self.config.batch_size,
            flush_ms = self.config.flush_interval.as_millis() as u64,
            "writer started"
        );

        loop {
            let batch = self
                .queue
                .pop_batch_for(self.config.batch_size, self.config.flush_interval)
                .await;

            if !batch.is_empty() {
                for line in &batch {
                    sink.write_line(line)?;
                }
                self.stats.record_written(batch.len() as u64);
            }

            if self.queue.is_closed() && self.queue.is_empty() {
                break;
            }
        }

        tracing::info!("writer drained and stopped");
        Ok(())
    }
}

/// Handle to a running writer task
pub struct WriterHandle {
    queue: Arc<LogQueue>,
    task: JoinHandle<Result<(), WriterError>>,
}

impl WriterHandle {
    /// Close the queue and wait for the writer to drain and exit
    pub async fn stop(self) -> Result<(), WriterError> {
        self.queue.close();
        self.task.await?
    }

    /// Wait for the writer without closing the queue
    ///
    /// While the queue is open this completes only on writer failure;
    /// the collector selects on it to notice a dead writer early.
    pub async fn wait(&mut self) -> Result<(), WriterError> {
        (&mut self.task).await?
    }

    /// Whether the writer task has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
